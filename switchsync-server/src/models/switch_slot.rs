use serde::{Deserialize, Serialize};
use switchsync_api::models::{ManualConfig, ManualMode, SwitchConfig, SwitchKind};
use time::OffsetDateTime;

use super::Table;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SwitchSlot {
    pub id: i32,
    pub unit_id: i32,
    pub name: String,
    pub pin: i32,
    pub kind: String,
    pub state: bool,
    pub manual_pin: Option<i32>,
    pub manual_active_low: Option<bool>,
    pub manual_mode: Option<String>,
    pub changed_at: Option<OffsetDateTime>,
}

pub fn kind_from_str(kind: &str) -> Option<SwitchKind> {
    match kind {
        "relay" => Some(SwitchKind::Relay),
        "light" => Some(SwitchKind::Light),
        "fan" => Some(SwitchKind::Fan),
        "outlet" => Some(SwitchKind::Outlet),
        "projector" => Some(SwitchKind::Projector),
        "climate" => Some(SwitchKind::Climate),
        _ => None,
    }
}

pub fn mode_from_str(mode: &str) -> Option<ManualMode> {
    match mode {
        "maintained" => Some(ManualMode::Maintained),
        "momentary" => Some(ManualMode::Momentary),
        _ => None,
    }
}

impl SwitchSlot {
    /// Wire snapshot entry for `identified` / `config_update` frames.
    pub fn to_config(&self) -> SwitchConfig {
        SwitchConfig {
            name: self.name.clone(),
            pin: self.pin as u8,
            kind: kind_from_str(&self.kind).unwrap_or(SwitchKind::Relay),
            state: self.state,
            manual: self.manual_pin.map(|pin| ManualConfig {
                pin: pin as u8,
                active_low: self.manual_active_low.unwrap_or(true),
                mode: self
                    .manual_mode
                    .as_deref()
                    .and_then(mode_from_str)
                    .unwrap_or(ManualMode::Maintained),
            }),
        }
    }
}

#[derive(Clone)]
pub struct SwitchSlotTable;

impl Table for SwitchSlotTable {
    fn name(&self) -> &'static str {
        "switch_slots"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS switch_slots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                unit_id INTEGER NOT NULL,
                name VARCHAR(255) NOT NULL,
                pin INTEGER NOT NULL,
                kind VARCHAR(16) NOT NULL DEFAULT 'relay',
                state BOOLEAN NOT NULL DEFAULT FALSE,
                manual_pin INTEGER,
                manual_active_low BOOLEAN,
                manual_mode VARCHAR(16),
                changed_at TIMESTAMP,
                UNIQUE (unit_id, pin),
                FOREIGN KEY (unit_id) REFERENCES units (id) ON DELETE CASCADE
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS switch_slots;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["units"]
    }
}
