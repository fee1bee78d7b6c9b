use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::configs::{SchemaManager, Settings, Storage};
use crate::handles::*;
use crate::repositories::{QueuedIntentRepository, SwitchSlotRepository, UnitRepository};
use crate::services::transport::{unit_socket_router, UnitSocketState};
use crate::services::{
    CommandSequencer, ConnectionRegistry, EventBus, IdentityGate, OfflineQueue, SyncService,
};

pub async fn create_app(settings: &Arc<Settings>) -> Router {
    let storage = Arc::new(
        Storage::new(settings.database.clone(), SchemaManager::default())
            .await
            .unwrap(),
    );

    let units = UnitRepository::new(storage.clone());
    let slots = SwitchSlotRepository::new(storage.clone());
    let intents = QueuedIntentRepository::new(storage.clone());

    let registry = Arc::new(ConnectionRegistry::new());
    let sequencer = Arc::new(CommandSequencer::new());
    let offline = Arc::new(OfflineQueue::new(intents));
    let events = Arc::new(EventBus::new());

    let sync = Arc::new(SyncService::new(
        registry.clone(),
        sequencer.clone(),
        offline,
        events,
        units.clone(),
        slots.clone(),
    ));
    sync.start_liveness_sweep(
        Duration::from_secs(settings.sync.sweep_interval_secs),
        time::Duration::seconds(settings.sync.stale_after_secs as i64),
    );

    let gate = Arc::new(IdentityGate::new(
        settings.sync.permissive,
        registry.clone(),
        sequencer,
        sync.clone(),
        units.clone(),
        slots.clone(),
    ));

    let unit_socket = unit_socket_router(UnitSocketState {
        gate,
        sync: sync.clone(),
        registry: registry.clone(),
        identify_timeout: Duration::from_secs(settings.sync.identify_timeout_secs),
    });

    let switch_api = Router::new()
        .route("/:unit_id/switches/:pin", post(toggle_switch))
        .route("/:unit_id/switches", post(toggle_switches_bulk))
        .route("/:unit_id/queue", get(get_queue_status))
        .with_state(SwitchApiState { sync });

    let unit_api = Router::new()
        .route("/", get(get_units))
        .route("/:unit_id/slots", get(get_unit_switches))
        .route("/:unit_id/config", put(update_unit_config))
        .with_state(UnitApiState {
            registry,
            units,
            slots,
        });

    Router::new()
        .nest("/units", switch_api.merge(unit_api))
        .merge(unit_socket)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
