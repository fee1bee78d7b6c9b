use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::Error;
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::errors::UnitError;
use crate::models::switch_slot::{kind_from_str, mode_from_str};
use crate::models::SwitchSlot;

/// Administrative description of one slot, used when replacing a unit's
/// switch map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotSpec {
    pub name: String,
    pub pin: u8,
    pub kind: String,
    #[serde(default)]
    pub state: bool,
    #[serde(default)]
    pub manual_pin: Option<u8>,
    #[serde(default)]
    pub manual_active_low: Option<bool>,
    #[serde(default)]
    pub manual_mode: Option<String>,
}

/// Within one unit no two slots may claim the same output pin or manual pin,
/// across both pin roles.
pub fn validate_slots(slots: &[SlotSpec]) -> Result<(), UnitError> {
    let mut taken = HashSet::new();

    for slot in slots {
        if kind_from_str(&slot.kind).is_none() {
            return Err(UnitError::InvalidKind);
        }
        if let Some(mode) = &slot.manual_mode {
            if mode_from_str(mode).is_none() {
                return Err(UnitError::InvalidMode);
            }
        }
        if !taken.insert(slot.pin) {
            return Err(UnitError::PinConflict);
        }
        if let Some(manual_pin) = slot.manual_pin {
            if !taken.insert(manual_pin) {
                return Err(UnitError::PinConflict);
            }
        }
    }

    Ok(())
}

#[derive(Clone)]
pub struct SwitchSlotRepository {
    storage: Arc<Storage>,
}

impl SwitchSlotRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub async fn create(&self, item: &SwitchSlot) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO switch_slots (unit_id, name, pin, kind, state, manual_pin, manual_active_low, manual_mode, changed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(item.unit_id)
        .bind(&item.name)
        .bind(item.pin)
        .bind(&item.kind)
        .bind(item.state)
        .bind(item.manual_pin)
        .bind(item.manual_active_low)
        .bind(&item.manual_mode)
        .bind(item.changed_at)
        .execute(self.storage.get_pool())
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find_by_unit(&self, unit_id: i32) -> Result<Vec<SwitchSlot>, Error> {
        let slots: Vec<SwitchSlot> =
            sqlx::query_as("SELECT * FROM switch_slots WHERE unit_id = $1 ORDER BY id")
                .bind(unit_id)
                .fetch_all(self.storage.get_pool())
                .await?;

        Ok(slots)
    }

    pub async fn find_by_unit_and_pin(
        &self,
        unit_id: i32,
        pin: u8,
    ) -> Result<Option<SwitchSlot>, Error> {
        let slot: Option<SwitchSlot> =
            sqlx::query_as("SELECT * FROM switch_slots WHERE unit_id = $1 AND pin = $2")
                .bind(unit_id)
                .bind(pin as i32)
                .fetch_optional(self.storage.get_pool())
                .await?;

        Ok(slot)
    }

    /// Hardware-confirmed state write; the reconciliation engine is the only
    /// caller.
    pub async fn update_state(
        &self,
        unit_id: i32,
        pin: u8,
        state: bool,
        changed_at: OffsetDateTime,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE switch_slots
            SET state = $1, changed_at = $2
            WHERE unit_id = $3 AND pin = $4
            "#,
        )
        .bind(state)
        .bind(changed_at)
        .bind(unit_id)
        .bind(pin as i32)
        .execute(self.storage.get_pool())
        .await?;

        Ok(())
    }

    /// Swap a unit's whole switch map in one transaction. Validation happens
    /// in the caller before the push.
    pub async fn replace_for_unit(
        &self,
        unit_id: i32,
        slots: &[SlotSpec],
        changed_at: OffsetDateTime,
    ) -> Result<(), Error> {
        let mut transaction = self.storage.get_pool().begin().await?;

        sqlx::query("DELETE FROM switch_slots WHERE unit_id = $1")
            .bind(unit_id)
            .execute(&mut *transaction)
            .await?;

        for slot in slots {
            sqlx::query(
                r#"
                INSERT INTO switch_slots (unit_id, name, pin, kind, state, manual_pin, manual_active_low, manual_mode, changed_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(unit_id)
            .bind(&slot.name)
            .bind(slot.pin as i32)
            .bind(&slot.kind)
            .bind(slot.state)
            .bind(slot.manual_pin.map(|pin| pin as i32))
            .bind(slot.manual_active_low)
            .bind(&slot.manual_mode)
            .bind(changed_at)
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(pin: u8, manual_pin: Option<u8>) -> SlotSpec {
        SlotSpec {
            name: "Test".into(),
            pin,
            kind: "light".into(),
            state: false,
            manual_pin,
            manual_active_low: Some(true),
            manual_mode: Some("maintained".into()),
        }
    }

    #[test]
    fn accepts_disjoint_pins() {
        assert!(validate_slots(&[spec(16, Some(34)), spec(17, Some(35))]).is_ok());
    }

    #[test]
    fn rejects_duplicate_output_pins() {
        assert!(matches!(
            validate_slots(&[spec(16, None), spec(16, None)]),
            Err(UnitError::PinConflict)
        ));
    }

    #[test]
    fn rejects_manual_pin_colliding_with_output_pin() {
        assert!(matches!(
            validate_slots(&[spec(16, None), spec(17, Some(16))]),
            Err(UnitError::PinConflict)
        ));
    }

    #[test]
    fn rejects_unknown_kind_and_mode() {
        let mut bad_kind = spec(16, None);
        bad_kind.kind = "toaster".into();
        assert!(matches!(
            validate_slots(&[bad_kind]),
            Err(UnitError::InvalidKind)
        ));

        let mut bad_mode = spec(16, Some(34));
        bad_mode.manual_mode = Some("latched".into());
        assert!(matches!(
            validate_slots(&[bad_mode]),
            Err(UnitError::InvalidMode)
        ));
    }
}
