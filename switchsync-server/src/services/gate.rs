use std::sync::Arc;

use switchsync_api::frame::ServerFrame;
use switchsync_api::models::GateMode;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::errors::SyncError;
use crate::models::Unit;
use crate::repositories::{SwitchSlotRepository, UnitRepository};
use crate::services::reconciler::SyncService;
use crate::services::registry::ConnectionRegistry;
use crate::services::sequencer::CommandSequencer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    UnknownUnit,
    SecretMismatch,
}

pub enum Admission {
    Accepted { unit: Unit, session: Uuid },
    Rejected(RejectReason),
}

/// Validates a connecting unit's claimed identity before admitting it to the
/// connection registry.
pub struct IdentityGate {
    permissive: bool,
    registry: Arc<ConnectionRegistry>,
    sequencer: Arc<CommandSequencer>,
    sync: Arc<SyncService>,
    units: UnitRepository,
    slots: SwitchSlotRepository,
}

impl IdentityGate {
    pub fn new(
        permissive: bool,
        registry: Arc<ConnectionRegistry>,
        sequencer: Arc<CommandSequencer>,
        sync: Arc<SyncService>,
        units: UnitRepository,
        slots: SwitchSlotRepository,
    ) -> Self {
        if permissive {
            tracing::warn!("identity gate running in permissive mode; do not use in production");
        }

        Self {
            permissive,
            registry,
            sequencer,
            sync,
            units,
            slots,
        }
    }

    pub fn mode(&self) -> GateMode {
        if self.permissive {
            GateMode::Permissive
        } else {
            GateMode::Enforced
        }
    }

    pub fn permissive(&self) -> bool {
        self.permissive
    }

    /// Admit or reject a connecting unit. On admission the transport becomes
    /// the unit's sole channel, the unit is marked reachable, the config
    /// snapshot goes out, and the offline queue is flushed — in that order,
    /// so the controller has its switch map before flushed commands arrive.
    pub async fn identify(
        &self,
        unit_id: &str,
        secret: &str,
        address: Option<String>,
        sender: mpsc::UnboundedSender<ServerFrame>,
    ) -> Result<Admission, SyncError> {
        let Some(mut unit) = self.units.find_by_unit_id(unit_id).await? else {
            tracing::warn!("identify from unknown unit {}", unit_id);
            return Ok(Admission::Rejected(RejectReason::UnknownUnit));
        };

        if unit.secret != secret {
            if self.permissive {
                tracing::warn!("unit {} presented a wrong secret; admitted in permissive mode", unit_id);
            } else {
                tracing::warn!("secret mismatch for unit {}", unit_id);
                return Ok(Admission::Rejected(RejectReason::SecretMismatch));
            }
        }

        if let Some(address) = address {
            self.units.update_address(unit.id, &address).await?;
            unit.address = Some(address);
        }

        let session = self.registry.register(unit_id, sender).await;
        // A rebooted controller restarts its report numbering from its own
        // baseline; forget ours so its reports are not dropped as stale.
        self.sequencer.reset_reports(unit_id).await;
        self.sync.mark_reachable(&unit).await?;

        let switches = self
            .slots
            .find_by_unit(unit.id)
            .await?
            .iter()
            .map(|slot| slot.to_config())
            .collect();

        let identified = ServerFrame::Identified {
            mode: self.mode(),
            switches,
            motion: unit.motion_config(),
        };
        if self.registry.send_frame(unit_id, identified).await.is_err() {
            tracing::warn!("identified frame for {} was not delivered", unit_id);
        }

        self.sync.flush_queue(&unit).await?;

        tracing::info!("unit {} identified", unit_id);

        Ok(Admission::Accepted { unit, session })
    }
}
