use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::errors::{ApiError, SyncError};
use crate::services::reconciler::{SyncService, ToggleAck};

#[derive(Clone)]
pub struct SwitchApiState {
    pub sync: Arc<SyncService>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ToggleBody {
    pub state: bool,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ToggleResponse {
    /// `pending` when a command went out, `queued` when the unit is
    /// unreachable and the intent was recorded instead.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl From<ToggleAck> for ToggleResponse {
    fn from(ack: ToggleAck) -> Self {
        match ack {
            ToggleAck::Pending { seq } => ToggleResponse {
                status: "pending".into(),
                seq: Some(seq),
            },
            ToggleAck::Queued => ToggleResponse {
                status: "queued".into(),
                seq: None,
            },
        }
    }
}

pub async fn toggle_switch(
    Path((unit_id, pin)): Path<(String, u8)>,
    State(state): State<SwitchApiState>,
    Json(body): Json<ToggleBody>,
) -> Result<impl IntoResponse, ApiError> {
    let ack = state.sync.toggle(&unit_id, pin, body.state).await?;

    Ok(Json(ToggleResponse::from(ack)))
}

#[derive(Clone, Serialize, Deserialize)]
pub struct BulkCommand {
    pub pin: u8,
    pub state: bool,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct BulkToggleBody {
    pub commands: Vec<BulkCommand>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct BulkToggleResult {
    pub pin: u8,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

pub async fn toggle_switches_bulk(
    Path(unit_id): Path<String>,
    State(state): State<SwitchApiState>,
    Json(body): Json<BulkToggleBody>,
) -> Result<impl IntoResponse, ApiError> {
    let commands: Vec<(u8, bool)> = body
        .commands
        .iter()
        .map(|command| (command.pin, command.state))
        .collect();

    let acks = state.sync.toggle_bulk(&unit_id, &commands).await?;

    let results: Vec<BulkToggleResult> = acks
        .into_iter()
        .map(|(pin, ack)| match ack {
            Ok(ToggleAck::Pending { seq }) => BulkToggleResult {
                pin,
                status: "pending".into(),
                seq: Some(seq),
            },
            Ok(ToggleAck::Queued) => BulkToggleResult {
                pin,
                status: "queued".into(),
                seq: None,
            },
            Err(SyncError::UnknownPin) => BulkToggleResult {
                pin,
                status: "unknown_pin".into(),
                seq: None,
            },
            Err(_) => BulkToggleResult {
                pin,
                status: "failed".into(),
                seq: None,
            },
        })
        .collect();

    Ok(Json(results))
}

#[derive(Clone, Serialize, Deserialize)]
pub struct QueuedIntentView {
    pub pin: u8,
    pub state: bool,
    pub created_at: OffsetDateTime,
}

pub async fn get_queue_status(
    Path(unit_id): Path<String>,
    State(state): State<SwitchApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let intents = state.sync.queue_status(&unit_id).await?;

    let views: Vec<QueuedIntentView> = intents
        .into_iter()
        .map(|intent| QueuedIntentView {
            pin: intent.pin as u8,
            state: intent.state,
            created_at: intent.created_at,
        })
        .collect();

    Ok(Json(views))
}
