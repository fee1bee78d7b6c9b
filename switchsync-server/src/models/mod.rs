pub mod queued_intent;
pub mod switch_slot;
pub mod unit;

pub use queued_intent::QueuedIntent;
pub use switch_slot::SwitchSlot;
pub use unit::{Reachability, Unit};

pub trait Table: Send + Sync {
    fn name(&self) -> &'static str;

    fn create(&self) -> String;

    fn dispose(&self) -> String;

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
