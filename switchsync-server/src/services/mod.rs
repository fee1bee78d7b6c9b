pub mod event_bus;
pub mod gate;
pub mod offline_queue;
pub mod reconciler;
pub mod registry;
pub mod sequencer;
pub mod transport;

pub use event_bus::{EventBus, EventPayload};
pub use gate::{Admission, IdentityGate, RejectReason};
pub use offline_queue::OfflineQueue;
pub use reconciler::{SyncService, ToggleAck};
pub use registry::ConnectionRegistry;
pub use sequencer::CommandSequencer;
