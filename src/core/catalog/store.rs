use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::catalog::ModRecord;
use crate::core::error::{PackError, PackResult};
use crate::core::storage::{self, DocumentStore};

const CATALOG_KEY: &str = "catalog";

#[derive(Default, Serialize, Deserialize)]
struct CatalogDocument {
    records: Vec<ModRecord>,
}

/// Content-addressed table of [`ModRecord`]s, deduplicated by source key.
///
/// In-memory map persisted as a single document; mutations persist eagerly.
pub struct CatalogStore {
    storage: Arc<dyn DocumentStore>,
    records: BTreeMap<String, ModRecord>,
}

impl CatalogStore {
    pub fn load(storage: Arc<dyn DocumentStore>) -> PackResult<Self> {
        let doc: CatalogDocument =
            storage::load_json(storage.as_ref(), CATALOG_KEY)?.unwrap_or_default();
        let records = doc
            .records
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();
        Ok(Self { storage, records })
    }

    fn persist(&self) -> PackResult<()> {
        let doc = CatalogDocument {
            records: self.records.values().cloned().collect(),
        };
        storage::save_json(self.storage.as_ref(), CATALOG_KEY, &doc)
    }

    /// Insert a record, or return the existing one when an identical source
    /// key is already catalogued. Existing fields are never overwritten, so
    /// user-curated edits survive re-imports.
    pub fn upsert(&mut self, record: ModRecord) -> PackResult<ModRecord> {
        let key = record.source_key();
        if let Some(existing) = self.records.values().find(|r| r.source_key() == key) {
            return Ok(existing.clone());
        }

        info!("Catalogued '{}' ({})", record.name, key);
        let stored = record.clone();
        self.records.insert(record.id.clone(), record);
        self.persist()?;
        Ok(stored)
    }

    pub fn get(&self, id: &str) -> PackResult<&ModRecord> {
        self.records
            .get(id)
            .ok_or_else(|| PackError::ModNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Raw removal. Referential cascade across modpacks is coordinated by
    /// `PackManager::delete_record`.
    pub fn remove(&mut self, id: &str) -> PackResult<bool> {
        let removed = self.records.remove(id).is_some();
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn find_by_key(&self, source_key: &str) -> Option<&ModRecord> {
        self.records.values().find(|r| r.source_key() == source_key)
    }

    /// All catalogued versions of one upstream project.
    pub fn find_by_project(&self, project_key: &str) -> Vec<&ModRecord> {
        self.records
            .values()
            .filter(|r| r.source.project_key().as_deref() == Some(project_key))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
