use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Table;

/// Operator intent recorded while a unit is unreachable. At most one row per
/// (unit, pin); the latest intent wins.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueuedIntent {
    pub id: i32,
    pub unit_id: i32,
    pub pin: i32,
    pub state: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct QueuedIntentTable;

impl Table for QueuedIntentTable {
    fn name(&self) -> &'static str {
        "queued_intents"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS queued_intents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                unit_id INTEGER NOT NULL,
                pin INTEGER NOT NULL,
                state BOOLEAN NOT NULL,
                created_at TIMESTAMP NOT NULL,
                UNIQUE (unit_id, pin),
                FOREIGN KEY (unit_id) REFERENCES units (id) ON DELETE CASCADE
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS queued_intents;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["units"]
    }
}
