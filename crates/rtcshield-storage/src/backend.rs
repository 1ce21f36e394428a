//! Raw key/value backends for the policy store

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::Result;

/// Synchronous key/value storage of serialized JSON documents
pub trait Backend: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write every entry atomically
    fn put_all(&self, entries: &[(&str, String)]) -> Result<()>;
}

/// Volatile backend, used by tests and hosts without a data directory
#[derive(Clone, Default)]
pub struct MemoryBackend {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn put_all(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut values = self.values.write();
        for (key, value) in entries {
            values.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}
