use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use switchsync_api::frame::ServerFrame;
use switchsync_api::models::MotionConfig;
use time::OffsetDateTime;

use crate::errors::{ApiError, SyncError};
use crate::models::unit::UnitView;
use crate::repositories::switch_slot::validate_slots;
use crate::repositories::{SlotSpec, SwitchSlotRepository, UnitRepository};
use crate::services::registry::ConnectionRegistry;

#[derive(Clone)]
pub struct UnitApiState {
    pub registry: Arc<ConnectionRegistry>,
    pub units: UnitRepository,
    pub slots: SwitchSlotRepository,
}

pub async fn get_units(
    State(state): State<UnitApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let units = state.units.find_all().await?;

    // Secrets never leave the server in plaintext.
    let views: Vec<UnitView> = units.iter().map(|unit| unit.redacted()).collect();

    Ok(Json(views))
}

pub async fn get_unit_switches(
    Path(unit_id): Path<String>,
    State(state): State<UnitApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let unit = state
        .units
        .find_by_unit_id(&unit_id)
        .await?
        .ok_or(SyncError::UnitNotFound)?;

    let slots = state.slots.find_by_unit(unit.id).await?;

    Ok(Json(slots))
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ConfigBody {
    pub switches: Vec<SlotSpec>,
    #[serde(default)]
    pub motion: Option<MotionConfig>,
}

/// Replace a unit's switch topology and push the change to the controller.
/// Pin uniqueness is enforced here, before anything is written.
pub async fn update_unit_config(
    Path(unit_id): Path<String>,
    State(state): State<UnitApiState>,
    Json(body): Json<ConfigBody>,
) -> Result<impl IntoResponse, ApiError> {
    validate_slots(&body.switches)?;

    let unit = state
        .units
        .find_by_unit_id(&unit_id)
        .await?
        .ok_or(SyncError::UnitNotFound)?;

    state
        .slots
        .replace_for_unit(unit.id, &body.switches, OffsetDateTime::now_utc())
        .await?;
    state
        .units
        .update_motion(
            unit.id,
            body.motion.map(|motion| motion.pin as i32),
            body.motion.map(|motion| motion.auto_off_secs as i32),
        )
        .await?;

    let switches = state
        .slots
        .find_by_unit(unit.id)
        .await?
        .iter()
        .map(|slot| slot.to_config())
        .collect();

    let frame = ServerFrame::ConfigUpdate {
        switches,
        motion: body.motion,
    };
    // Best effort: an unreachable unit receives the snapshot at its next
    // identification anyway.
    if state.registry.send_frame(&unit_id, frame).await.is_err() {
        tracing::info!("config update for {} deferred until reconnect", unit_id);
    }

    let slots = state.slots.find_by_unit(unit.id).await?;
    Ok(Json(slots))
}
