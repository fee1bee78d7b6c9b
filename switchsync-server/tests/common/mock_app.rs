use std::sync::Arc;

use switchsync_server::configs::{Database, SchemaManager, Storage};
use switchsync_server::models::{SwitchSlot, Unit};
use switchsync_server::repositories::{
    QueuedIntentRepository, SwitchSlotRepository, UnitRepository,
};
use switchsync_server::services::{
    CommandSequencer, ConnectionRegistry, EventBus, IdentityGate, OfflineQueue, SyncService,
};

pub const TEST_UNIT_ID: &str = "24:6F:28:AE:52:7C";
pub const TEST_SECRET: &str = "classroom-secret";

pub struct MockApp {
    pub storage: Arc<Storage>,
    pub units: UnitRepository,
    pub slots: SwitchSlotRepository,
    pub registry: Arc<ConnectionRegistry>,
    pub sequencer: Arc<CommandSequencer>,
    pub events: Arc<EventBus>,
    pub sync: Arc<SyncService>,
    pub gate: Arc<IdentityGate>,
}

impl MockApp {
    pub async fn new() -> Self {
        Self::with_permissive(false).await
    }

    pub async fn with_permissive(permissive: bool) -> Self {
        let storage = Arc::new(
            Storage::new(
                Database {
                    migration_path: None,
                    clean_start: true,
                    url: String::from("sqlite::memory:"),
                },
                SchemaManager::default(),
            )
            .await
            .unwrap(),
        );

        let units = UnitRepository::new(storage.clone());
        let slots = SwitchSlotRepository::new(storage.clone());
        let intents = QueuedIntentRepository::new(storage.clone());

        let registry = Arc::new(ConnectionRegistry::new());
        let sequencer = Arc::new(CommandSequencer::new());
        let events = Arc::new(EventBus::new());

        let sync = Arc::new(SyncService::new(
            registry.clone(),
            sequencer.clone(),
            Arc::new(OfflineQueue::new(intents)),
            events.clone(),
            units.clone(),
            slots.clone(),
        ));

        let gate = Arc::new(IdentityGate::new(
            permissive,
            registry.clone(),
            sequencer.clone(),
            sync.clone(),
            units.clone(),
            slots.clone(),
        ));

        Self {
            storage,
            units,
            slots,
            registry,
            sequencer,
            events,
            sync,
            gate,
        }
    }

    pub async fn create_test_unit(&self) -> Unit {
        sqlx::query_as::<_, Unit>(
            r#"
            INSERT INTO units (unit_id, name, secret, status)
                VALUES ($1, 'Room 101', $2, 'offline')
                RETURNING *;
            "#,
        )
        .bind(TEST_UNIT_ID)
        .bind(TEST_SECRET)
        .fetch_one(self.storage.get_pool())
        .await
        .unwrap()
    }

    pub async fn create_test_slot(&self, unit_id: i32, pin: i32) -> SwitchSlot {
        sqlx::query_as::<_, SwitchSlot>(
            r#"
            INSERT INTO switch_slots (unit_id, name, pin, kind, state)
                VALUES ($1, 'Front lights', $2, 'light', FALSE)
                RETURNING *;
            "#,
        )
        .bind(unit_id)
        .bind(pin)
        .fetch_one(self.storage.get_pool())
        .await
        .unwrap()
    }
}
