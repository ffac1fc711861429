use crate::core::SnapshotSlot;
use crate::utils::error::{CartError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-process slot. Clones share the same map, so a test can keep one
/// handle and inspect what the engine wrote through another.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotSlot for MemorySlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().map_err(|_| CartError::StoreCorrupt {
            reason: "memory slot lock poisoned".to_string(),
        })?;
        Ok(values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| CartError::StoreCorrupt {
            reason: "memory slot lock poisoned".to_string(),
        })?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
