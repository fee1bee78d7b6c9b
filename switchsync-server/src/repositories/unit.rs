use std::sync::Arc;

use sqlx::Error;
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::unit::Reachability;
use crate::models::Unit;

#[derive(Clone)]
pub struct UnitRepository {
    storage: Arc<Storage>,
}

impl UnitRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub async fn create(&self, item: &Unit) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO units (unit_id, name, address, secret, status, last_seen, motion_pin, motion_auto_off)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&item.unit_id)
        .bind(&item.name)
        .bind(&item.address)
        .bind(&item.secret)
        .bind(&item.status)
        .bind(item.last_seen)
        .bind(item.motion_pin)
        .bind(item.motion_auto_off)
        .execute(self.storage.get_pool())
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find_by_unit_id(&self, unit_id: &str) -> Result<Option<Unit>, Error> {
        let unit: Option<Unit> = sqlx::query_as("SELECT * FROM units WHERE unit_id = $1")
            .bind(unit_id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(unit)
    }

    pub async fn find_all(&self) -> Result<Vec<Unit>, Error> {
        let units: Vec<Unit> = sqlx::query_as("SELECT * FROM units ORDER BY name")
            .fetch_all(self.storage.get_pool())
            .await?;

        Ok(units)
    }

    /// Reachability write; last writer wins, so callers pass the observation
    /// timestamp rather than re-reading the clock.
    pub async fn update_status(
        &self,
        id: i32,
        status: Reachability,
        last_seen: OffsetDateTime,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE units
            SET status = $1, last_seen = $2
            WHERE id = $3
            "#,
        )
        .bind(status.as_str())
        .bind(last_seen)
        .bind(id)
        .execute(self.storage.get_pool())
        .await?;

        Ok(())
    }

    pub async fn update_address(&self, id: i32, address: &str) -> Result<(), Error> {
        sqlx::query("UPDATE units SET address = $1 WHERE id = $2")
            .bind(address)
            .bind(id)
            .execute(self.storage.get_pool())
            .await?;

        Ok(())
    }

    pub async fn update_motion(
        &self,
        id: i32,
        motion_pin: Option<i32>,
        motion_auto_off: Option<i32>,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE units SET motion_pin = $1, motion_auto_off = $2 WHERE id = $3")
            .bind(motion_pin)
            .bind(motion_auto_off)
            .bind(id)
            .execute(self.storage.get_pool())
            .await?;

        Ok(())
    }

    pub async fn update_last_seen(&self, id: i32, at: OffsetDateTime) -> Result<(), Error> {
        sqlx::query("UPDATE units SET last_seen = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(self.storage.get_pool())
            .await?;

        Ok(())
    }
}
