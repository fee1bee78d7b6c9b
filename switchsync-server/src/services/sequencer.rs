use std::collections::HashMap;
use std::sync::Arc;

use switchsync_api::sequence::{SeqCheck, Watermark};
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};

/// Per-unit sequencing state: the outbound command counter and the accepted
/// watermark for inbound state reports.
#[derive(Debug, Default)]
struct UnitSequence {
    next: u64,
    reports: Watermark,
}

/// Assigns strictly increasing per-unit command numbers and checks report
/// numbers against the per-unit accepted watermark.
///
/// Counters live in process memory. The baseline is seeded from the wall
/// clock (unix milliseconds) on first use, so a restarted server never
/// reissues a number at or below a controller's surviving watermark; no
/// persisted baseline is needed.
pub struct CommandSequencer {
    units: RwLock<HashMap<String, Arc<Mutex<UnitSequence>>>>,
}

impl CommandSequencer {
    pub fn new() -> Self {
        Self {
            units: RwLock::new(HashMap::new()),
        }
    }

    async fn entry(&self, unit_id: &str) -> Arc<Mutex<UnitSequence>> {
        if let Some(entry) = self.units.read().await.get(unit_id) {
            return entry.clone();
        }

        let mut units = self.units.write().await;
        units
            .entry(unit_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(UnitSequence::default())))
            .clone()
    }

    pub async fn next_seq(&self, unit_id: &str) -> u64 {
        let entry = self.entry(unit_id).await;
        let mut sequence = entry.lock().await;

        let now_ms = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64;
        sequence.next = now_ms.max(sequence.next + 1);
        sequence.next
    }

    pub async fn observe_report(&self, unit_id: &str, seq: u64) -> SeqCheck {
        let entry = self.entry(unit_id).await;
        let mut sequence = entry.lock().await;
        sequence.reports.observe(seq)
    }

    /// Forget the report baseline for a unit; called on fresh admission so a
    /// rebooted controller's restarted report numbering is not dropped as
    /// stale.
    pub async fn reset_reports(&self, unit_id: &str) {
        let entry = self.entry(unit_id).await;
        entry.lock().await.reports.reset();
    }
}

impl Default for CommandSequencer {
    fn default() -> Self {
        Self::new()
    }
}
