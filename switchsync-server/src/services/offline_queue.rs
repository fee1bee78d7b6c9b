use time::OffsetDateTime;

use crate::models::QueuedIntent;
use crate::repositories::QueuedIntentRepository;

/// Durable per-unit queue of operator intents recorded while the unit is
/// unreachable. Backed by the record store so intents survive a server
/// restart.
pub struct OfflineQueue {
    intents: QueuedIntentRepository,
}

impl OfflineQueue {
    pub fn new(intents: QueuedIntentRepository) -> Self {
        Self { intents }
    }

    /// Record an intent; an existing entry for the same (unit, pin) is
    /// overwritten, because a relay only has a current level.
    pub async fn enqueue(&self, unit_id: i32, pin: u8, state: bool) -> Result<(), sqlx::Error> {
        self.intents
            .upsert(unit_id, pin, state, OffsetDateTime::now_utc())
            .await
    }

    pub async fn pending(&self, unit_id: i32) -> Result<Vec<QueuedIntent>, sqlx::Error> {
        self.intents.find_by_unit(unit_id).await
    }

    /// Empty the queue, returning the entries in creation order. Called
    /// exactly once per reachable transition; delivery of the resulting
    /// commands is fire-and-forget.
    pub async fn take_all(&self, unit_id: i32) -> Result<Vec<QueuedIntent>, sqlx::Error> {
        self.intents.take_all(unit_id).await
    }
}
