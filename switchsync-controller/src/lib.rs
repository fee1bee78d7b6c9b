#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod controller;
pub mod error;
pub mod pins;
pub mod queue;
pub mod slot;
pub mod storage;

pub use controller::{Controller, ControllerConfig};
pub use error::{Error, Result};
pub use pins::{PinDriver, Pull};
pub use queue::{CommandOrigin, CommandQueue, SlotCommand};
pub use storage::{ConfigStore, MemoryStore};
