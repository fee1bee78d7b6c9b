//! The record interface over the persistent device catalog. The
//! synchronization core only touches units, slots and queued intents through
//! these repositories.

pub mod queued_intent;
pub mod switch_slot;
pub mod unit;

pub use queued_intent::QueuedIntentRepository;
pub use switch_slot::{SlotSpec, SwitchSlotRepository};
pub use unit::UnitRepository;
