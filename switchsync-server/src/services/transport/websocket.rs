use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use switchsync_api::frame::{ServerFrame, UnitFrame};
use switchsync_api::protocols::json::JsonProtocol;
use switchsync_api::protocols::Protocol;
use switchsync_api::signature;
use tokio::sync::mpsc;

use crate::models::Unit;
use crate::services::gate::{Admission, IdentityGate};
use crate::services::reconciler::SyncService;
use crate::services::registry::ConnectionRegistry;

#[derive(Clone)]
pub struct UnitSocketState {
    pub gate: Arc<IdentityGate>,
    pub sync: Arc<SyncService>,
    pub registry: Arc<ConnectionRegistry>,
    /// A fresh connection must identify within this window.
    pub identify_timeout: Duration,
}

pub fn unit_socket_router(state: UnitSocketState) -> Router {
    Router::new()
        .route("/unit-ws", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<UnitSocketState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, peer))
}

async fn handle_socket(socket: WebSocket, state: UnitSocketState, peer: SocketAddr) {
    let protocol = JsonProtocol;
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let forward_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("failed to encode outbound frame: {}", e);
                    continue;
                }
            };
            if sink.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Identification must complete within a bounded window or the
    // connection is dropped; retries within the window are allowed.
    let claimed = tokio::time::timeout(state.identify_timeout, async {
        while let Some(Ok(message)) = stream.next().await {
            let WsMessage::Text(text) = message else { continue };
            match protocol.deserialize::<UnitFrame>(text.as_bytes()) {
                Ok(UnitFrame::Identify { unit, secret }) => return Some((unit, secret)),
                Ok(_) => tracing::debug!("frame before identification ignored"),
                Err(e) => tracing::warn!("undecodable frame during identification: {:?}", e),
            }
        }
        None
    })
    .await;

    let Ok(Some((unit_id, secret))) = claimed else {
        tracing::info!("connection dropped before identification");
        forward_task.abort();
        return;
    };

    let admission = match state
        .gate
        .identify(&unit_id, &secret, Some(peer.to_string()), tx)
        .await
    {
        Ok(admission) => admission,
        Err(e) => {
            tracing::error!("identify for {} failed: {}", unit_id, e);
            forward_task.abort();
            return;
        }
    };

    let (unit, session) = match admission {
        Admission::Accepted { unit, session } => (unit, session),
        Admission::Rejected(reason) => {
            tracing::warn!("identity rejected for {}: {:?}", unit_id, reason);
            forward_task.abort();
            return;
        }
    };

    while let Some(result) = stream.next().await {
        match result {
            Ok(WsMessage::Text(text)) => match protocol.deserialize::<UnitFrame>(text.as_bytes()) {
                Ok(frame) => handle_unit_frame(&state, &unit, frame).await,
                Err(e) => tracing::warn!("undecodable frame from {}: {:?}", unit.unit_id, e),
            },
            Ok(WsMessage::Close(_)) => break,
            Err(e) => {
                tracing::warn!("transport error for {}: {}", unit.unit_id, e);
                break;
            }
            _ => {}
        }
    }

    forward_task.abort();

    // Only the session that still owns the registry entry marks the unit
    // unreachable; a reconnect may already have taken over.
    if state.registry.unregister(&unit.unit_id, session).await {
        if let Err(e) = state.sync.mark_unreachable(&unit).await {
            tracing::error!("failed to mark {} unreachable: {}", unit.unit_id, e);
        }
        tracing::info!("unit {} disconnected", unit.unit_id);
    }
}

async fn handle_unit_frame(state: &UnitSocketState, unit: &Unit, frame: UnitFrame) {
    match frame {
        UnitFrame::StateUpdate { seq, switches, sig } => {
            let canonical = signature::state_update_canonical(&unit.unit_id, seq, &switches);
            if !report_admissible(state, unit, &canonical, sig.as_deref()) {
                return;
            }

            match state.sync.handle_state_update(unit, &switches, seq).await {
                Ok(changed) => {
                    let ack = ServerFrame::StateAck { changed };
                    let _ = state.registry.send_frame(&unit.unit_id, ack).await;
                }
                Err(e) => tracing::error!("state update from {} failed: {}", unit.unit_id, e),
            }
        }
        UnitFrame::SwitchResult {
            pin,
            success,
            requested,
            actual,
            reason,
            seq,
            sig,
        } => {
            let canonical =
                signature::switch_result_canonical(&unit.unit_id, seq, pin, success, actual);
            if !report_admissible(state, unit, &canonical, sig.as_deref()) {
                return;
            }

            if let Err(e) = state
                .sync
                .handle_switch_result(unit, pin, success, requested, actual, reason, seq)
                .await
            {
                tracing::error!("switch result from {} failed: {}", unit.unit_id, e);
            }
        }
        UnitFrame::Heartbeat { uptime } => {
            if let Err(e) = state.sync.handle_heartbeat(unit, uptime).await {
                tracing::error!("heartbeat from {} failed: {}", unit.unit_id, e);
            }
        }
        UnitFrame::Identify { .. } => {
            tracing::debug!("duplicate identify from {} ignored", unit.unit_id);
        }
    }
}

/// Signature policy for report frames: enforced deployments require a valid
/// keyed hash; permissive mode admits anything but logs the gap.
fn report_admissible(
    state: &UnitSocketState,
    unit: &Unit,
    canonical: &str,
    sig: Option<&str>,
) -> bool {
    let valid = sig.is_some_and(|sig| signature::verify(&unit.secret, canonical, sig));
    if valid {
        return true;
    }

    if state.gate.permissive() {
        tracing::warn!(
            "accepting {} report frame from {} (permissive mode)",
            if sig.is_some() { "badly signed" } else { "unsigned" },
            unit.unit_id
        );
        return true;
    }

    tracing::warn!("rejecting unsigned or forged report frame from {}", unit.unit_id);
    false
}
