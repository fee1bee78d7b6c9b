use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use switchsync_api::frame::ServerFrame;
use switchsync_api::models::{FailureReason, PinState};
use switchsync_api::sequence::SeqCheck;
use time::{Duration, OffsetDateTime};
use tokio::sync::{Mutex, RwLock};

use crate::errors::SyncError;
use crate::models::unit::Reachability;
use crate::models::{QueuedIntent, Unit};
use crate::repositories::{SwitchSlotRepository, UnitRepository};
use crate::services::event_bus::{topic, EventBus, EventPayload};
use crate::services::offline_queue::OfflineQueue;
use crate::services::registry::ConnectionRegistry;
use crate::services::sequencer::CommandSequencer;

/// Answer to an operator toggle. `Queued` is a distinct outcome, never
/// silently dropped and never presented as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAck {
    /// Command sent; confirmation outstanding.
    Pending { seq: u64 },
    /// Unit unreachable; intent recorded for the next reconnect.
    Queued,
}

#[derive(Debug, Clone, Copy)]
struct PendingCommand {
    desired: bool,
    seq: u64,
}

/// Separates operator-desired state from hardware-confirmed state.
///
/// Desired state is broadcast optimistically and tracked per (unit, pin) as
/// at most one outstanding `PendingConfirm`; the record store is only
/// written once the controller reports an outcome, and always with the
/// controller's reported actual value.
pub struct SyncService {
    registry: Arc<ConnectionRegistry>,
    sequencer: Arc<CommandSequencer>,
    offline: Arc<OfflineQueue>,
    events: Arc<EventBus>,
    units: UnitRepository,
    slots: SwitchSlotRepository,
    pending: RwLock<HashMap<String, Arc<Mutex<HashMap<u8, PendingCommand>>>>>,
}

impl SyncService {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        sequencer: Arc<CommandSequencer>,
        offline: Arc<OfflineQueue>,
        events: Arc<EventBus>,
        units: UnitRepository,
        slots: SwitchSlotRepository,
    ) -> Self {
        Self {
            registry,
            sequencer,
            offline,
            events,
            units,
            slots,
            pending: RwLock::new(HashMap::new()),
        }
    }

    async fn pending_for(&self, unit_id: &str) -> Arc<Mutex<HashMap<u8, PendingCommand>>> {
        if let Some(entry) = self.pending.read().await.get(unit_id) {
            return entry.clone();
        }

        let mut pending = self.pending.write().await;
        pending
            .entry(unit_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(HashMap::new())))
            .clone()
    }

    pub async fn find_unit(&self, unit_id: &str) -> Result<Unit, SyncError> {
        self.units
            .find_by_unit_id(unit_id)
            .await?
            .ok_or(SyncError::UnitNotFound)
    }

    /// Operator toggle for one (unit, pin).
    pub async fn toggle(&self, unit_id: &str, pin: u8, state: bool) -> Result<ToggleAck, SyncError> {
        let unit = self.find_unit(unit_id).await?;
        self.slots
            .find_by_unit_and_pin(unit.id, pin)
            .await?
            .ok_or(SyncError::UnknownPin)?;

        self.toggle_slot(&unit, pin, state).await
    }

    /// Bulk operation over several pins of one unit; per-pin outcomes so a
    /// single unknown pin does not abort the rest.
    pub async fn toggle_bulk(
        &self,
        unit_id: &str,
        commands: &[(u8, bool)],
    ) -> Result<Vec<(u8, Result<ToggleAck, SyncError>)>, SyncError> {
        let unit = self.find_unit(unit_id).await?;

        let mut acks = Vec::with_capacity(commands.len());
        for &(pin, state) in commands {
            let ack = match self.slots.find_by_unit_and_pin(unit.id, pin).await? {
                Some(_) => self.toggle_slot(&unit, pin, state).await,
                None => Err(SyncError::UnknownPin),
            };
            acks.push((pin, ack));
        }

        Ok(acks)
    }

    async fn toggle_slot(&self, unit: &Unit, pin: u8, state: bool) -> Result<ToggleAck, SyncError> {
        if !self.registry.is_reachable(&unit.unit_id).await {
            return self.queue_intent(unit, pin, state).await;
        }

        let now = OffsetDateTime::now_utc();
        let seq = self.sequencer.next_seq(&unit.unit_id).await;

        {
            // One outstanding PendingConfirm per (unit, pin): a second
            // toggle replaces the desired value instead of stacking.
            let pending = self.pending_for(&unit.unit_id).await;
            pending
                .lock()
                .await
                .insert(pin, PendingCommand { desired: state, seq });
        }

        self.events
            .publish(
                topic::SWITCH_INTENT,
                EventPayload::SwitchIntent {
                    unit_id: unit.unit_id.clone(),
                    pin,
                    state,
                    timestamp: now,
                },
            )
            .await;

        let frame = ServerFrame::SwitchCommand { pin, state, seq };
        match self.registry.send_frame(&unit.unit_id, frame).await {
            Ok(()) => Ok(ToggleAck::Pending { seq }),
            Err(_) => {
                // Lost the race with a disconnect; fall back to the queue.
                let pending = self.pending_for(&unit.unit_id).await;
                pending.lock().await.remove(&pin);
                self.queue_intent(unit, pin, state).await
            }
        }
    }

    async fn queue_intent(&self, unit: &Unit, pin: u8, state: bool) -> Result<ToggleAck, SyncError> {
        self.offline.enqueue(unit.id, pin, state).await?;
        self.events
            .publish(
                topic::SWITCH_QUEUED,
                EventPayload::SwitchQueued {
                    unit_id: unit.unit_id.clone(),
                    pin,
                    state,
                    timestamp: OffsetDateTime::now_utc(),
                },
            )
            .await;

        Ok(ToggleAck::Queued)
    }

    /// Flush the offline queue; invoked exactly once at the moment a unit
    /// becomes reachable. Entries go out as ordinary sequenced commands and
    /// the queue is already cleared, so delivery is fire-and-forget —
    /// eventual correctness is result handling's job.
    pub async fn flush_queue(&self, unit: &Unit) -> Result<usize, SyncError> {
        let intents = self.offline.take_all(unit.id).await?;
        let count = intents.len();

        for QueuedIntent { pin, state, .. } in intents {
            let pin = pin as u8;
            let seq = self.sequencer.next_seq(&unit.unit_id).await;

            {
                let pending = self.pending_for(&unit.unit_id).await;
                pending
                    .lock()
                    .await
                    .insert(pin, PendingCommand { desired: state, seq });
            }

            self.events
                .publish(
                    topic::SWITCH_INTENT,
                    EventPayload::SwitchIntent {
                        unit_id: unit.unit_id.clone(),
                        pin,
                        state,
                        timestamp: OffsetDateTime::now_utc(),
                    },
                )
                .await;

            let frame = ServerFrame::SwitchCommand { pin, state, seq };
            if self.registry.send_frame(&unit.unit_id, frame).await.is_err() {
                tracing::warn!(
                    "flush command for unit {} pin {} was not delivered",
                    unit.unit_id,
                    pin
                );
            }
        }

        if count > 0 {
            tracing::info!("flushed {} queued intents for unit {}", count, unit.unit_id);
        }

        Ok(count)
    }

    /// Authoritative command outcome from the controller. Correlation is
    /// stateless: (unit, pin, seq) is all that is matched, so duplicate
    /// delivery is harmless.
    pub async fn handle_switch_result(
        &self,
        unit: &Unit,
        pin: u8,
        success: bool,
        requested: bool,
        actual: bool,
        reason: Option<FailureReason>,
        seq: u64,
    ) -> Result<(), SyncError> {
        let now = OffsetDateTime::now_utc();

        {
            let pending = self.pending_for(&unit.unit_id).await;
            let mut map = pending.lock().await;
            if let Some(entry) = map.get(&pin) {
                // A newer replacement command stays outstanding.
                if entry.seq <= seq {
                    map.remove(&pin);
                }
            }
        }

        match reason {
            Some(FailureReason::Stale) => {
                // The controller discarded an out-of-order command; harmless.
                // The next state report is the corrective probe.
                tracing::debug!(
                    "unit {} dropped stale command for pin {} (seq {})",
                    unit.unit_id,
                    pin,
                    seq
                );
                return Ok(());
            }
            Some(FailureReason::UnknownPin) => {
                tracing::warn!(
                    "configuration drift: unit {} does not know pin {}",
                    unit.unit_id,
                    pin
                );
                self.events
                    .publish(
                        topic::SWITCH_BLOCKED,
                        EventPayload::SwitchBlocked {
                            unit_id: unit.unit_id.clone(),
                            pin,
                            requested,
                            actual,
                            reason: "unknown_pin".into(),
                            timestamp: now,
                        },
                    )
                    .await;
                return Ok(());
            }
            _ => {}
        }

        // Hardware is the source of truth: store the reported actual state,
        // even when it differs from what was requested.
        self.slots.update_state(unit.id, pin, actual, now).await?;

        if !success {
            let reason_label = match reason {
                Some(FailureReason::Hardware) => "hardware",
                Some(FailureReason::Busy) => "busy",
                _ => "failed",
            };
            self.events
                .publish(
                    topic::SWITCH_BLOCKED,
                    EventPayload::SwitchBlocked {
                        unit_id: unit.unit_id.clone(),
                        pin,
                        requested,
                        actual,
                        reason: reason_label.into(),
                        timestamp: now,
                    },
                )
                .await;
        }

        self.events
            .publish(
                topic::SWITCH_RESULT,
                EventPayload::SwitchResult {
                    unit_id: unit.unit_id.clone(),
                    pin,
                    success,
                    state: actual,
                    timestamp: now,
                },
            )
            .await;

        Ok(())
    }

    /// Unsolicited snapshot from the controller; reconciled after the
    /// per-unit report watermark check. Returns whether the record changed.
    pub async fn handle_state_update(
        &self,
        unit: &Unit,
        switches: &[PinState],
        seq: u64,
    ) -> Result<bool, SyncError> {
        if self.sequencer.observe_report(&unit.unit_id, seq).await == SeqCheck::Stale {
            tracing::debug!("dropping stale state report from {} (seq {})", unit.unit_id, seq);
            return Ok(false);
        }

        let now = OffsetDateTime::now_utc();
        self.registry.touch(&unit.unit_id, now).await;
        self.units.update_last_seen(unit.id, now).await?;

        let mut changes = Vec::new();
        for report in switches {
            let Some(slot) = self.slots.find_by_unit_and_pin(unit.id, report.pin).await? else {
                tracing::warn!("unit {} reported unknown pin {}", unit.unit_id, report.pin);
                continue;
            };
            if slot.state != report.state {
                self.slots
                    .update_state(unit.id, report.pin, report.state, now)
                    .await?;
                changes.push(*report);
            }
        }

        let changed = !changes.is_empty();
        if changed {
            self.events
                .publish(
                    topic::STATE_CHANGED,
                    EventPayload::StateChanged {
                        unit_id: unit.unit_id.clone(),
                        switches: changes,
                        timestamp: now,
                    },
                )
                .await;
        }

        Ok(changed)
    }

    pub async fn handle_heartbeat(&self, unit: &Unit, uptime: u64) -> Result<(), SyncError> {
        tracing::debug!("heartbeat from {} (up {}s)", unit.unit_id, uptime);

        let now = OffsetDateTime::now_utc();
        self.registry.touch(&unit.unit_id, now).await;
        self.units.update_last_seen(unit.id, now).await?;

        Ok(())
    }

    pub async fn queue_status(&self, unit_id: &str) -> Result<Vec<QueuedIntent>, SyncError> {
        let unit = self.find_unit(unit_id).await?;
        Ok(self.offline.pending(unit.id).await?)
    }

    pub async fn mark_reachable(&self, unit: &Unit) -> Result<(), SyncError> {
        let now = OffsetDateTime::now_utc();
        self.units
            .update_status(unit.id, Reachability::Online, now)
            .await?;
        self.events
            .publish(
                topic::UNIT_STATUS,
                EventPayload::UnitStatus {
                    unit_id: unit.unit_id.clone(),
                    status: Reachability::Online.to_string(),
                    timestamp: now,
                },
            )
            .await;

        Ok(())
    }

    pub async fn mark_unreachable(&self, unit: &Unit) -> Result<(), SyncError> {
        let now = OffsetDateTime::now_utc();
        self.units
            .update_status(unit.id, Reachability::Offline, now)
            .await?;
        self.events
            .publish(
                topic::UNIT_STATUS,
                EventPayload::UnitStatus {
                    unit_id: unit.unit_id.clone(),
                    status: Reachability::Offline.to_string(),
                    timestamp: now,
                },
            )
            .await;

        Ok(())
    }

    /// Periodic sweep marking silently failed units unreachable,
    /// independent of per-connection activity.
    pub fn start_liveness_sweep(self: &Arc<Self>, interval: StdDuration, stale_after: Duration) {
        let service = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            loop {
                ticker.tick().await;

                let swept = service.registry.sweep_stale(stale_after).await;
                for unit_id in swept {
                    tracing::info!("liveness sweep marked {} unreachable", unit_id);
                    match service.units.find_by_unit_id(&unit_id).await {
                        Ok(Some(unit)) => {
                            if let Err(e) = service.mark_unreachable(&unit).await {
                                tracing::error!("failed to mark {} unreachable: {}", unit_id, e);
                            }
                        }
                        Ok(None) => {}
                        Err(e) => tracing::error!("liveness sweep lookup failed: {}", e),
                    }
                }
            }
        });
    }

    /// Desired value of the outstanding command for a pin, if any. Exposed
    /// for observability and tests.
    pub async fn pending_desired(&self, unit_id: &str, pin: u8) -> Option<bool> {
        let pending = self.pending_for(unit_id).await;
        let map = pending.lock().await;
        map.get(&pin).map(|entry| entry.desired)
    }
}
