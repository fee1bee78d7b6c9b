use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use switchsync_api::models::PinState;
use time::OffsetDateTime;
use tokio::sync::{broadcast, RwLock};

/// Events published to observers (dashboards, notification sinks). Delivery
/// is fire-and-forget; a slow observer can never block command processing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EventPayload {
    /// Optimistic operator intent, broadcast before the hardware confirms.
    SwitchIntent {
        unit_id: String,
        pin: u8,
        state: bool,
        timestamp: OffsetDateTime,
    },
    /// Intent recorded for an unreachable unit.
    SwitchQueued {
        unit_id: String,
        pin: u8,
        state: bool,
        timestamp: OffsetDateTime,
    },
    /// Authoritative command outcome; `state` is the hardware-reported
    /// actual level.
    SwitchResult {
        unit_id: String,
        pin: u8,
        success: bool,
        state: bool,
        timestamp: OffsetDateTime,
    },
    /// A command was denied or failed; observers should roll back any
    /// optimistic UI to `actual`.
    SwitchBlocked {
        unit_id: String,
        pin: u8,
        requested: bool,
        actual: bool,
        reason: String,
        timestamp: OffsetDateTime,
    },
    UnitStatus {
        unit_id: String,
        status: String,
        timestamp: OffsetDateTime,
    },
    /// Unsolicited report reconciled into the record store.
    StateChanged {
        unit_id: String,
        switches: Vec<PinState>,
        timestamp: OffsetDateTime,
    },
}

pub mod topic {
    pub const SWITCH_INTENT: &str = "switch.intent";
    pub const SWITCH_QUEUED: &str = "switch.queued";
    pub const SWITCH_RESULT: &str = "switch.result";
    pub const SWITCH_BLOCKED: &str = "switch.blocked";
    pub const UNIT_STATUS: &str = "unit.status";
    pub const STATE_CHANGED: &str = "state.changed";
}

pub struct EventBus {
    publishers: Arc<RwLock<HashMap<String, broadcast::Sender<EventPayload>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            publishers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn publish(&self, event_type: &str, payload: EventPayload) -> usize {
        let sender = {
            let mut publishers = self.publishers.write().await;
            publishers
                .entry(event_type.to_string())
                .or_insert_with(|| broadcast::channel(100).0)
                .clone()
        };

        // No subscribers is fine; the bus is a sink, not a pipeline stage.
        sender.send(payload).unwrap_or(0)
    }

    pub async fn subscribe(&self, event_type: &str) -> broadcast::Receiver<EventPayload> {
        let sender = {
            let mut publishers = self.publishers.write().await;
            publishers
                .entry(event_type.to_string())
                .or_insert_with(|| broadcast::channel(100).0)
                .clone()
        };

        sender.subscribe()
    }

    pub async fn has_subscribers(&self, event_type: &str) -> bool {
        let publishers = self.publishers.read().await;
        publishers
            .get(event_type)
            .is_some_and(|sender| sender.receiver_count() > 0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
