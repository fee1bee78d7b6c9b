mod common;

use common::mock_app::{MockApp, TEST_SECRET, TEST_UNIT_ID};
use switchsync_api::frame::ServerFrame;
use switchsync_api::models::GateMode;
use switchsync_server::services::{Admission, RejectReason};
use tokio::sync::mpsc;

#[tokio::test]
async fn unknown_unit_is_rejected() {
    let app = MockApp::new().await;

    let (tx, _rx) = mpsc::unbounded_channel();
    let admission = app.gate.identify("FF:FF:FF:FF:FF:FF", "whatever", None, tx).await.unwrap();

    assert!(matches!(
        admission,
        Admission::Rejected(RejectReason::UnknownUnit)
    ));
}

#[tokio::test]
async fn secret_mismatch_is_rejected_and_unit_stays_offline() {
    let app = MockApp::new().await;
    app.create_test_unit().await;

    let (tx, _rx) = mpsc::unbounded_channel();
    let admission = app.gate.identify(TEST_UNIT_ID, "wrong", None, tx).await.unwrap();

    assert!(matches!(
        admission,
        Admission::Rejected(RejectReason::SecretMismatch)
    ));
    assert!(!app.registry.is_reachable(TEST_UNIT_ID).await);

    let stored = app.units.find_by_unit_id(TEST_UNIT_ID).await.unwrap().unwrap();
    assert_eq!(stored.status, "offline");
}

#[tokio::test]
async fn permissive_mode_admits_a_wrong_secret() {
    let app = MockApp::with_permissive(true).await;
    app.create_test_unit().await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let admission = app.gate.identify(TEST_UNIT_ID, "wrong", None, tx).await.unwrap();

    assert!(matches!(admission, Admission::Accepted { .. }));
    match rx.recv().await.unwrap() {
        ServerFrame::Identified { mode, .. } => assert_eq!(mode, GateMode::Permissive),
        other => panic!("expected identified frame, got {:?}", other),
    }
}

#[tokio::test]
async fn admission_pushes_the_switch_snapshot() {
    let app = MockApp::new().await;
    let unit = app.create_test_unit().await;
    app.create_test_slot(unit.id, 4).await;
    app.create_test_slot(unit.id, 5).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let admission = app.gate.identify(TEST_UNIT_ID, TEST_SECRET, None, tx).await.unwrap();
    assert!(matches!(admission, Admission::Accepted { .. }));

    match rx.recv().await.unwrap() {
        ServerFrame::Identified { mode, switches, .. } => {
            assert_eq!(mode, GateMode::Enforced);
            assert_eq!(switches.len(), 2);
            assert_eq!(switches[0].pin, 4);
        }
        other => panic!("expected identified frame, got {:?}", other),
    }
}

#[tokio::test]
async fn reconnect_evicts_the_prior_channel() {
    let app = MockApp::new().await;
    app.create_test_unit().await;

    let (tx1, _rx1) = mpsc::unbounded_channel();
    let first = app.gate.identify(TEST_UNIT_ID, TEST_SECRET, None, tx1).await.unwrap();
    let Admission::Accepted { session: first_session, .. } = first else {
        panic!("expected admission");
    };

    let (tx2, mut rx2) = mpsc::unbounded_channel();
    let second = app.gate.identify(TEST_UNIT_ID, TEST_SECRET, None, tx2).await.unwrap();
    assert!(matches!(second, Admission::Accepted { .. }));

    // The superseded session cannot prune the fresh channel.
    assert!(!app.registry.unregister(TEST_UNIT_ID, first_session).await);
    assert!(app.registry.is_reachable(TEST_UNIT_ID).await);

    app.registry
        .send_frame(TEST_UNIT_ID, ServerFrame::StateAck { changed: false })
        .await
        .unwrap();
    // Skip the identified frame, then find the ack on the live channel.
    let mut saw_ack = false;
    while let Ok(frame) = rx2.try_recv() {
        if matches!(frame, ServerFrame::StateAck { .. }) {
            saw_ack = true;
        }
    }
    assert!(saw_ack);
}

#[tokio::test]
async fn report_watermark_resets_on_fresh_admission() {
    let app = MockApp::new().await;
    let unit = app.create_test_unit().await;
    app.create_test_slot(unit.id, 4).await;

    // A previous session left a high report watermark behind.
    app.sequencer.observe_report(TEST_UNIT_ID, 1_000_000).await;

    let (tx, _rx) = mpsc::unbounded_channel();
    app.gate.identify(TEST_UNIT_ID, TEST_SECRET, None, tx).await.unwrap();

    // A rebooted controller reports from a small baseline again.
    let changed = app
        .sync
        .handle_state_update(
            &unit,
            &[switchsync_api::models::PinState { pin: 4, state: true }],
            3,
        )
        .await
        .unwrap();
    assert!(changed);
}
