mod common;

use common::mock_app::{MockApp, TEST_SECRET, TEST_UNIT_ID};
use switchsync_api::frame::ServerFrame;
use switchsync_api::models::{FailureReason, PinState};
use switchsync_server::services::event_bus::topic;
use switchsync_server::services::{Admission, ToggleAck};
use tokio::sync::mpsc;

#[tokio::test]
async fn offline_toggle_is_acknowledged_as_queued() {
    let app = MockApp::new().await;
    let unit = app.create_test_unit().await;
    app.create_test_slot(unit.id, 4).await;

    let mut queued_events = app.events.subscribe(topic::SWITCH_QUEUED).await;

    let ack = app.sync.toggle(TEST_UNIT_ID, 4, true).await.unwrap();
    assert_eq!(ack, ToggleAck::Queued);
    assert!(queued_events.try_recv().is_ok());

    // The optimistic record is untouched while the unit is unreachable.
    let slot = app.slots.find_by_unit_and_pin(unit.id, 4).await.unwrap().unwrap();
    assert!(!slot.state);
}

#[tokio::test]
async fn repeated_offline_toggles_leave_one_intent() {
    let app = MockApp::new().await;
    let unit = app.create_test_unit().await;
    app.create_test_slot(unit.id, 4).await;

    app.sync.toggle(TEST_UNIT_ID, 4, true).await.unwrap();
    app.sync.toggle(TEST_UNIT_ID, 4, false).await.unwrap();

    let queued = app.sync.queue_status(TEST_UNIT_ID).await.unwrap();
    assert_eq!(queued.len(), 1);
    assert!(!queued[0].state); // last intent wins
}

#[tokio::test]
async fn reconnect_flushes_exactly_one_command_per_pin() {
    let app = MockApp::new().await;
    let unit = app.create_test_unit().await;
    app.create_test_slot(unit.id, 4).await;

    app.sync.toggle(TEST_UNIT_ID, 4, false).await.unwrap();
    app.sync.toggle(TEST_UNIT_ID, 4, true).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let admission = app.gate.identify(TEST_UNIT_ID, TEST_SECRET, None, tx).await.unwrap();
    assert!(matches!(admission, Admission::Accepted { .. }));

    // Snapshot first, then the flushed intent.
    let first = rx.recv().await.unwrap();
    assert!(matches!(first, ServerFrame::Identified { .. }));

    let second = rx.recv().await.unwrap();
    match second {
        ServerFrame::SwitchCommand { pin, state, .. } => {
            assert_eq!(pin, 4);
            assert!(state);
        }
        other => panic!("expected switch command, got {:?}", other),
    }

    assert!(rx.try_recv().is_err());
    assert!(app.sync.queue_status(TEST_UNIT_ID).await.unwrap().is_empty());

    let stored = app.units.find_by_unit_id(TEST_UNIT_ID).await.unwrap().unwrap();
    assert_eq!(stored.status, "online");
}

#[tokio::test]
async fn flush_round_trip_confirms_the_desired_state() {
    let app = MockApp::new().await;
    let unit = app.create_test_unit().await;
    app.create_test_slot(unit.id, 4).await;

    app.sync.toggle(TEST_UNIT_ID, 4, true).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    app.gate.identify(TEST_UNIT_ID, TEST_SECRET, None, tx).await.unwrap();

    rx.recv().await.unwrap(); // identified
    let seq = match rx.recv().await.unwrap() {
        ServerFrame::SwitchCommand { seq, .. } => seq,
        other => panic!("expected switch command, got {:?}", other),
    };

    app.sync
        .handle_switch_result(&unit, 4, true, true, true, None, seq)
        .await
        .unwrap();

    let slot = app.slots.find_by_unit_and_pin(unit.id, 4).await.unwrap().unwrap();
    assert!(slot.state);
    assert_eq!(app.sync.pending_desired(TEST_UNIT_ID, 4).await, None);
}

#[tokio::test]
async fn success_with_differing_actual_stores_the_actual_value() {
    let app = MockApp::new().await;
    let unit = app.create_test_unit().await;
    app.create_test_slot(unit.id, 4).await;

    // Hardware reports the relay stayed off despite a successful apply path.
    app.sync
        .handle_switch_result(&unit, 4, true, true, false, None, 100)
        .await
        .unwrap();

    let slot = app.slots.find_by_unit_and_pin(unit.id, 4).await.unwrap().unwrap();
    assert!(!slot.state);
}

#[tokio::test]
async fn hardware_failure_reconciles_and_surfaces_a_blocked_notice() {
    let app = MockApp::new().await;
    let unit = app.create_test_unit().await;
    app.create_test_slot(unit.id, 4).await;

    let mut blocked = app.events.subscribe(topic::SWITCH_BLOCKED).await;
    let mut results = app.events.subscribe(topic::SWITCH_RESULT).await;

    app.sync
        .handle_switch_result(
            &unit,
            4,
            false,
            true,
            false,
            Some(FailureReason::Hardware),
            100,
        )
        .await
        .unwrap();

    let slot = app.slots.find_by_unit_and_pin(unit.id, 4).await.unwrap().unwrap();
    assert!(!slot.state);
    assert!(blocked.try_recv().is_ok());
    assert!(results.try_recv().is_ok());
}

#[tokio::test]
async fn stale_result_is_a_silent_no_op() {
    let app = MockApp::new().await;
    let unit = app.create_test_unit().await;
    app.create_test_slot(unit.id, 4).await;

    let mut blocked = app.events.subscribe(topic::SWITCH_BLOCKED).await;
    let mut results = app.events.subscribe(topic::SWITCH_RESULT).await;

    app.sync
        .handle_switch_result(&unit, 4, false, true, false, Some(FailureReason::Stale), 5)
        .await
        .unwrap();

    // No operator-facing error and no record mutation.
    assert!(blocked.try_recv().is_err());
    assert!(results.try_recv().is_err());
    let slot = app.slots.find_by_unit_and_pin(unit.id, 4).await.unwrap().unwrap();
    assert!(!slot.state);
}

#[tokio::test]
async fn unknown_pin_result_is_surfaced_but_never_retried() {
    let app = MockApp::new().await;
    let unit = app.create_test_unit().await;
    app.create_test_slot(unit.id, 4).await;

    let mut blocked = app.events.subscribe(topic::SWITCH_BLOCKED).await;

    app.sync
        .handle_switch_result(
            &unit,
            9,
            false,
            true,
            false,
            Some(FailureReason::UnknownPin),
            100,
        )
        .await
        .unwrap();

    assert!(blocked.try_recv().is_ok());
}

#[tokio::test]
async fn state_report_watermark_drops_reordered_reports() {
    let app = MockApp::new().await;
    let unit = app.create_test_unit().await;
    app.create_test_slot(unit.id, 4).await;

    let changed = app
        .sync
        .handle_state_update(&unit, &[PinState { pin: 4, state: true }], 10)
        .await
        .unwrap();
    assert!(changed);

    // An older snapshot arriving late must not rewind the record.
    let changed = app
        .sync
        .handle_state_update(&unit, &[PinState { pin: 4, state: false }], 5)
        .await
        .unwrap();
    assert!(!changed);

    let slot = app.slots.find_by_unit_and_pin(unit.id, 4).await.unwrap().unwrap();
    assert!(slot.state);
}

#[tokio::test]
async fn second_toggle_replaces_the_pending_desired_value() {
    let app = MockApp::new().await;
    let unit = app.create_test_unit().await;
    app.create_test_slot(unit.id, 4).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    app.registry.register(TEST_UNIT_ID, tx).await;

    let first = app.sync.toggle(TEST_UNIT_ID, 4, true).await.unwrap();
    let second = app.sync.toggle(TEST_UNIT_ID, 4, false).await.unwrap();

    let (ToggleAck::Pending { seq: first_seq }, ToggleAck::Pending { seq: second_seq }) =
        (first, second)
    else {
        panic!("expected both toggles to go out as commands");
    };
    assert!(second_seq > first_seq);

    assert_eq!(app.sync.pending_desired(TEST_UNIT_ID, 4).await, Some(false));

    // Both commands were sent; the controller's watermark handles ordering.
    assert!(matches!(
        rx.try_recv().unwrap(),
        ServerFrame::SwitchCommand { state: true, .. }
    ));
    assert!(matches!(
        rx.try_recv().unwrap(),
        ServerFrame::SwitchCommand { state: false, .. }
    ));

    // The late result for the replaced command must not clear the newer
    // pending entry.
    app.sync
        .handle_switch_result(&unit, 4, true, true, true, None, first_seq)
        .await
        .unwrap();
    assert_eq!(app.sync.pending_desired(TEST_UNIT_ID, 4).await, Some(false));
}

#[tokio::test]
async fn toggle_broadcasts_optimistic_intent_without_touching_the_record() {
    let app = MockApp::new().await;
    let unit = app.create_test_unit().await;
    app.create_test_slot(unit.id, 4).await;

    let (tx, _rx) = mpsc::unbounded_channel();
    app.registry.register(TEST_UNIT_ID, tx).await;

    let mut intents = app.events.subscribe(topic::SWITCH_INTENT).await;

    app.sync.toggle(TEST_UNIT_ID, 4, true).await.unwrap();

    assert!(intents.try_recv().is_ok());
    let slot = app.slots.find_by_unit_and_pin(unit.id, 4).await.unwrap().unwrap();
    assert!(!slot.state); // confirmed state waits for the result
}

#[tokio::test]
async fn bulk_toggle_reports_per_pin_outcomes() {
    let app = MockApp::new().await;
    let unit = app.create_test_unit().await;
    app.create_test_slot(unit.id, 4).await;
    app.create_test_slot(unit.id, 5).await;

    let (tx, _rx) = mpsc::unbounded_channel();
    app.registry.register(TEST_UNIT_ID, tx).await;

    let acks = app
        .sync
        .toggle_bulk(TEST_UNIT_ID, &[(4, true), (5, true), (9, true)])
        .await
        .unwrap();

    assert_eq!(acks.len(), 3);
    assert!(matches!(acks[0], (4, Ok(ToggleAck::Pending { .. }))));
    assert!(matches!(acks[1], (5, Ok(ToggleAck::Pending { .. }))));
    assert!(matches!(acks[2], (9, Err(_))));
}
