use std::sync::Arc;

use sqlx::Error;
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::QueuedIntent;

#[derive(Clone)]
pub struct QueuedIntentRepository {
    storage: Arc<Storage>,
}

impl QueuedIntentRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Last intent wins: a second write for the same (unit, pin) replaces
    /// the stored state and timestamp.
    pub async fn upsert(
        &self,
        unit_id: i32,
        pin: u8,
        state: bool,
        created_at: OffsetDateTime,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO queued_intents (unit_id, pin, state, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (unit_id, pin)
            DO UPDATE SET state = excluded.state, created_at = excluded.created_at
            "#,
        )
        .bind(unit_id)
        .bind(pin as i32)
        .bind(state)
        .bind(created_at)
        .execute(self.storage.get_pool())
        .await?;

        Ok(())
    }

    pub async fn find_by_unit(&self, unit_id: i32) -> Result<Vec<QueuedIntent>, Error> {
        let intents: Vec<QueuedIntent> = sqlx::query_as(
            "SELECT * FROM queued_intents WHERE unit_id = $1 ORDER BY created_at, id",
        )
        .bind(unit_id)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(intents)
    }

    /// Drain the queue in creation order; the rows are gone regardless of
    /// what happens to the commands built from them.
    pub async fn take_all(&self, unit_id: i32) -> Result<Vec<QueuedIntent>, Error> {
        let mut transaction = self.storage.get_pool().begin().await?;

        let intents: Vec<QueuedIntent> = sqlx::query_as(
            "SELECT * FROM queued_intents WHERE unit_id = $1 ORDER BY created_at, id",
        )
        .bind(unit_id)
        .fetch_all(&mut *transaction)
        .await?;

        sqlx::query("DELETE FROM queued_intents WHERE unit_id = $1")
            .bind(unit_id)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;

        Ok(intents)
    }
}
