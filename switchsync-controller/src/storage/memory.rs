use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

use super::ConfigStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
        }
    }
}

impl ConfigStore for MemoryStore {
    type Error = ();

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.data.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), Self::Error> {
        self.data.remove(key);
        Ok(())
    }
}
