mod memory;

pub use memory::*;

use alloc::string::String;

/// Key-value non-volatile storage for the switch snapshot.
///
/// Writes go straight to the backing medium; the controller rate-limits how
/// often it calls `set_item` to bound flash wear.
pub trait ConfigStore {
    type Error: core::fmt::Debug;

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), Self::Error>;

    fn remove_item(&mut self, key: &str) -> Result<(), Self::Error>;
}
