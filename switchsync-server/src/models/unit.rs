use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Table;

/// Reachability as tracked in the record store. Live connection events and
/// the liveness sweep both write it; last writer wins, keyed by the
/// monotonically increasing last-seen timestamp.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    Online,
    Offline,
    Error,
}

impl Reachability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reachability::Online => "online",
            Reachability::Offline => "offline",
            Reachability::Error => "error",
        }
    }
}

impl fmt::Display for Reachability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One networked controller unit. The `secret` column is write-once and must
/// never leave the server in plaintext; operator-facing views go through
/// [`Unit::redacted`].
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Unit {
    pub id: i32,
    /// Stable hardware address, e.g. "24:6F:28:AE:52:7C".
    pub unit_id: String,
    pub name: String,
    /// Last known network address, maintained by the transport layer.
    pub address: Option<String>,
    pub secret: String,
    pub status: String,
    pub last_seen: Option<OffsetDateTime>,
    pub motion_pin: Option<i32>,
    pub motion_auto_off: Option<i32>,
}

/// Operator-facing projection without the shared secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitView {
    pub id: i32,
    pub unit_id: String,
    pub name: String,
    pub address: Option<String>,
    pub status: String,
    pub last_seen: Option<OffsetDateTime>,
}

impl Unit {
    pub fn redacted(&self) -> UnitView {
        UnitView {
            id: self.id,
            unit_id: self.unit_id.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
            status: self.status.clone(),
            last_seen: self.last_seen,
        }
    }

    pub fn motion_config(&self) -> Option<switchsync_api::models::MotionConfig> {
        match (self.motion_pin, self.motion_auto_off) {
            (Some(pin), auto_off) => Some(switchsync_api::models::MotionConfig {
                pin: pin as u8,
                auto_off_secs: auto_off.unwrap_or(0) as u16,
            }),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct UnitTable;

impl Table for UnitTable {
    fn name(&self) -> &'static str {
        "units"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS units (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                unit_id VARCHAR(64) NOT NULL UNIQUE,
                name VARCHAR(255) NOT NULL,
                address VARCHAR(64),
                secret VARCHAR(255) NOT NULL,
                status VARCHAR(16) NOT NULL DEFAULT 'offline',
                last_seen TIMESTAMP,
                motion_pin INTEGER,
                motion_auto_off INTEGER
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS units;")
    }
}
