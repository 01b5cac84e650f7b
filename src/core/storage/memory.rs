use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::core::error::{PackError, PackResult};
use crate::core::storage::DocumentStore;

/// In-memory document store for tests and ephemeral embedders.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, String>>,
    quarantined: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents moved aside by `quarantine`, keyed by original key.
    pub fn quarantined(&self, key: &str) -> Option<String> {
        self.quarantined
            .lock()
            .ok()
            .and_then(|q| q.get(key).cloned())
    }
}

fn poisoned() -> PackError {
    PackError::Storage("memory store lock poisoned".into())
}

impl DocumentStore for MemoryStore {
    fn read(&self, key: &str) -> PackResult<Option<String>> {
        let docs = self.docs.lock().map_err(|_| poisoned())?;
        Ok(docs.get(key).cloned())
    }

    fn write(&self, key: &str, contents: &str) -> PackResult<()> {
        let mut docs = self.docs.lock().map_err(|_| poisoned())?;
        docs.insert(key.to_string(), contents.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PackResult<()> {
        let mut docs = self.docs.lock().map_err(|_| poisoned())?;
        docs.remove(key);
        Ok(())
    }

    fn quarantine(&self, key: &str) -> PackResult<()> {
        let mut docs = self.docs.lock().map_err(|_| poisoned())?;
        if let Some(contents) = docs.remove(key) {
            let mut quarantined = self.quarantined.lock().map_err(|_| poisoned())?;
            quarantined.insert(key.to_string(), contents);
        }
        Ok(())
    }

    fn list(&self, prefix: &str) -> PackResult<Vec<String>> {
        let docs = self.docs.lock().map_err(|_| poisoned())?;
        let wanted = format!("{prefix}/");
        Ok(docs
            .keys()
            .filter(|k| k.starts_with(&wanted) && !k[wanted.len()..].contains('/'))
            .cloned()
            .collect())
    }
}
