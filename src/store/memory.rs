//! Reference in-memory payload store.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::core::{Payload, Result};
use crate::store::PayloadStore;

/// HashMap-backed store behind an `RwLock`, so shared references
/// suffice for all operations. Useful for tests and single-process
/// deployments.
#[derive(Default)]
pub struct InMemoryPayloadStore {
    entries: RwLock<HashMap<String, Payload>>,
}

impl InMemoryPayloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PayloadStore for InMemoryPayloadStore {
    fn read(&self, key: &str) -> Payload {
        match self.entries.read() {
            Ok(entries) => entries.get(key).cloned().unwrap_or_default(),
            Err(err) => {
                warn!(key, error = %err, "payload store read failed, treating as absent");
                Payload::new()
            }
        }
    }

    fn write(&self, key: &str, payload: &Payload) -> Result<()> {
        let mut entries = self.entries.write()?;
        entries.insert(key.to_string(), payload.clone());
        debug!(key, "payload written to memory store");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write()?;
        entries.remove(key);
        debug!(key, "payload removed from memory store");
        Ok(())
    }

    fn info(&self, option: Option<&str>) -> Payload {
        let mut info = Payload::new();
        info.insert("backend", self.name());
        info.insert("entries", self.len() as i64);
        if let Some(option) = option {
            info.insert("option", option);
        }
        info
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
