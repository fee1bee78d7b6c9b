use std::collections::HashMap;

use switchsync_api::frame::ServerFrame;
use time::{Duration, OffsetDateTime};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::errors::SyncError;

struct UnitChannel {
    sender: mpsc::UnboundedSender<ServerFrame>,
    session: Uuid,
    last_seen: OffsetDateTime,
}

/// One live transport per unit identity.
///
/// The map lock is held only for lookups and membership changes; frames are
/// sent over per-unit unbounded channels, so one unit's traffic never blocks
/// another's.
pub struct ConnectionRegistry {
    channels: RwLock<HashMap<String, UnitChannel>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Register `sender` as the sole channel for the unit, evicting any
    /// prior one. Returns the session token the owning task must present to
    /// unregister.
    pub async fn register(&self, unit_id: &str, sender: mpsc::UnboundedSender<ServerFrame>) -> Uuid {
        let session = Uuid::new_v4();
        let channel = UnitChannel {
            sender,
            session,
            last_seen: OffsetDateTime::now_utc(),
        };

        let mut channels = self.channels.write().await;
        if channels.insert(unit_id.to_string(), channel).is_some() {
            tracing::info!("evicted prior channel for unit {}", unit_id);
        }

        session
    }

    /// Prune the registry entry, but only when `session` still owns it; a
    /// reconnect may already have replaced the channel.
    pub async fn unregister(&self, unit_id: &str, session: Uuid) -> bool {
        let mut channels = self.channels.write().await;
        match channels.get(unit_id) {
            Some(channel) if channel.session == session => {
                channels.remove(unit_id);
                true
            }
            _ => false,
        }
    }

    pub async fn is_reachable(&self, unit_id: &str) -> bool {
        self.channels.read().await.contains_key(unit_id)
    }

    pub async fn send_frame(&self, unit_id: &str, frame: ServerFrame) -> Result<(), SyncError> {
        let channels = self.channels.read().await;
        let channel = channels.get(unit_id).ok_or(SyncError::Unreachable)?;
        channel.sender.send(frame).map_err(|_| SyncError::Unreachable)
    }

    /// Record liveness evidence; last writer wins, keyed by the later
    /// timestamp, so a sweep and a live connection can race safely.
    pub async fn touch(&self, unit_id: &str, at: OffsetDateTime) {
        let mut channels = self.channels.write().await;
        if let Some(channel) = channels.get_mut(unit_id) {
            if at > channel.last_seen {
                channel.last_seen = at;
            }
        }
    }

    pub async fn last_seen(&self, unit_id: &str) -> Option<OffsetDateTime> {
        self.channels
            .read()
            .await
            .get(unit_id)
            .map(|channel| channel.last_seen)
    }

    /// Prune every unit whose last-seen exceeds the staleness threshold,
    /// covering silent failures the transport layer never observed.
    pub async fn sweep_stale(&self, stale_after: Duration) -> Vec<String> {
        let now = OffsetDateTime::now_utc();
        let mut channels = self.channels.write().await;

        let stale: Vec<String> = channels
            .iter()
            .filter(|(_, channel)| now - channel.last_seen > stale_after)
            .map(|(unit_id, _)| unit_id.clone())
            .collect();

        for unit_id in &stale {
            channels.remove(unit_id);
        }

        stale
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_evicts_prior_channel() {
        let registry = ConnectionRegistry::new();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        registry.register("AA:BB", tx1).await;
        registry.register("AA:BB", tx2).await;

        registry
            .send_frame("AA:BB", ServerFrame::StateAck { changed: false })
            .await
            .unwrap();

        assert!(rx2.try_recv().is_ok());
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregister_ignores_a_superseded_session() {
        let registry = ConnectionRegistry::new();

        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        let old_session = registry.register("AA:BB", tx1).await;
        registry.register("AA:BB", tx2).await;

        assert!(!registry.unregister("AA:BB", old_session).await);
        assert!(registry.is_reachable("AA:BB").await);
    }

    #[tokio::test]
    async fn send_to_unknown_unit_is_unreachable() {
        let registry = ConnectionRegistry::new();
        assert!(matches!(
            registry
                .send_frame("AA:BB", ServerFrame::StateAck { changed: false })
                .await,
            Err(SyncError::Unreachable)
        ));
    }

    #[tokio::test]
    async fn sweep_prunes_silent_units() {
        let registry = ConnectionRegistry::new();

        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register("AA:BB", tx).await;
        registry
            .touch("AA:BB", OffsetDateTime::now_utc() - Duration::minutes(10))
            .await;

        // touch is monotonic, the stale timestamp above must not rewind
        assert!(registry.sweep_stale(Duration::minutes(5)).await.is_empty());

        // simulate a genuinely silent unit by sweeping with a zero threshold
        let swept = registry.sweep_stale(Duration::ZERO).await;
        assert_eq!(swept, vec!["AA:BB".to_string()]);
        assert!(!registry.is_reachable("AA:BB").await);
    }
}
