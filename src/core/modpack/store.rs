use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::core::catalog::{CatalogStore, LoaderKind, ModRecord};
use crate::core::error::{PackError, PackResult};
use crate::core::modpack::{ModpackDefinition, RemoteSource};
use crate::core::storage::{self, DocumentStore};

fn doc_key(id: &str) -> String {
    format!("modpacks/{id}")
}

/// Holds every [`ModpackDefinition`] and owns the membership/overlay
/// operations, including the supersede rule.
pub struct ModpackStore {
    storage: Arc<dyn DocumentStore>,
    packs: BTreeMap<String, ModpackDefinition>,
}

impl ModpackStore {
    pub fn load(storage: Arc<dyn DocumentStore>) -> PackResult<Self> {
        let mut packs = BTreeMap::new();
        for key in storage.list("modpacks")? {
            if let Some(pack) =
                storage::load_json::<ModpackDefinition>(storage.as_ref(), &key)?
            {
                packs.insert(pack.id.clone(), pack);
            }
        }
        Ok(Self { storage, packs })
    }

    fn persist(&self, id: &str) -> PackResult<()> {
        let pack = self
            .packs
            .get(id)
            .ok_or_else(|| PackError::ModpackNotFound(id.to_string()))?;
        storage::save_json(self.storage.as_ref(), &doc_key(id), pack)
    }

    pub fn create(
        &mut self,
        name: impl Into<String>,
        game_version: impl Into<String>,
        loader: LoaderKind,
    ) -> PackResult<ModpackDefinition> {
        let pack = ModpackDefinition::new(name, game_version, loader);
        info!("Created modpack '{}' ({})", pack.name, pack.id);
        self.packs.insert(pack.id.clone(), pack.clone());
        self.persist(&pack.id)?;
        Ok(pack)
    }

    pub fn get(&self, id: &str) -> PackResult<&ModpackDefinition> {
        self.packs
            .get(id)
            .ok_or_else(|| PackError::ModpackNotFound(id.to_string()))
    }

    pub fn list(&self) -> Vec<&ModpackDefinition> {
        self.packs.values().collect()
    }

    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> PackResult<()> {
        let pack = self
            .packs
            .get_mut(id)
            .ok_or_else(|| PackError::ModpackNotFound(id.to_string()))?;
        pack.name = name.into();
        self.persist(id)
    }

    pub fn set_description(&mut self, id: &str, description: impl Into<String>) -> PackResult<()> {
        let pack = self
            .packs
            .get_mut(id)
            .ok_or_else(|| PackError::ModpackNotFound(id.to_string()))?;
        pack.description = description.into();
        self.persist(id)
    }

    pub fn set_remote(&mut self, id: &str, url: impl Into<String>) -> PackResult<()> {
        let pack = self
            .packs
            .get_mut(id)
            .ok_or_else(|| PackError::ModpackNotFound(id.to_string()))?;
        pack.remote = Some(RemoteSource {
            url: url.into(),
            last_checked: None,
        });
        self.persist(id)
    }

    pub fn mark_remote_checked(&mut self, id: &str) -> PackResult<()> {
        let pack = self
            .packs
            .get_mut(id)
            .ok_or_else(|| PackError::ModpackNotFound(id.to_string()))?;
        if let Some(remote) = pack.remote.as_mut() {
            remote.last_checked = Some(Utc::now());
        }
        self.persist(id)
    }

    /// Raw deletion of the definition document. History deletion is
    /// coordinated by `PackManager::delete_modpack`.
    pub fn delete(&mut self, id: &str) -> PackResult<bool> {
        if self.packs.remove(id).is_none() {
            return Ok(false);
        }
        self.storage.remove(&doc_key(id))?;
        info!("Deleted modpack {}", id);
        Ok(true)
    }

    // ── Membership & overlay ────────────────────────────

    /// Add a catalogued record to the membership.
    ///
    /// Idempotent when already present. Any existing member from the same
    /// upstream project is superseded: removed from both the membership and
    /// the disabled overlay. The new member always starts enabled; a
    /// superseded member's disabled flag is not carried forward.
    pub fn add_member(
        &mut self,
        modpack_id: &str,
        record: &ModRecord,
        catalog: &CatalogStore,
    ) -> PackResult<()> {
        let pack = self
            .packs
            .get_mut(modpack_id)
            .ok_or_else(|| PackError::ModpackNotFound(modpack_id.to_string()))?;

        if pack.is_member(&record.id) {
            return Ok(());
        }

        if let Some(project_key) = record.source.project_key() {
            let superseded: Vec<String> = pack
                .member_ids
                .iter()
                .filter(|mid| {
                    catalog
                        .get(mid)
                        .ok()
                        .and_then(|r| r.source.project_key())
                        .as_deref()
                        == Some(project_key.as_str())
                })
                .cloned()
                .collect();

            for old_id in superseded {
                pack.member_ids.retain(|m| m != &old_id);
                pack.disabled_ids.remove(&old_id);
                info!(
                    "Superseded {} with {} in modpack {}",
                    old_id, record.id, modpack_id
                );
            }
        }

        pack.member_ids.push(record.id.clone());
        self.persist(modpack_id)
    }

    /// Remove a member from both the membership and the overlay.
    /// Returns `false` when the id was not a member.
    pub fn remove_member(&mut self, modpack_id: &str, mod_id: &str) -> PackResult<bool> {
        let pack = self
            .packs
            .get_mut(modpack_id)
            .ok_or_else(|| PackError::ModpackNotFound(modpack_id.to_string()))?;

        if !pack.is_member(mod_id) {
            return Ok(false);
        }

        pack.member_ids.retain(|m| m != mod_id);
        pack.disabled_ids.remove(mod_id);
        self.persist(modpack_id)?;
        Ok(true)
    }

    /// Move a member into or out of the disabled overlay.
    /// Returns `false` (no-op) when the id is not a member.
    pub fn set_enabled(&mut self, modpack_id: &str, mod_id: &str, enabled: bool) -> PackResult<bool> {
        let pack = self
            .packs
            .get_mut(modpack_id)
            .ok_or_else(|| PackError::ModpackNotFound(modpack_id.to_string()))?;

        if !pack.is_member(mod_id) {
            return Ok(false);
        }

        if enabled {
            pack.disabled_ids.remove(mod_id);
        } else {
            pack.disabled_ids.insert(mod_id.to_string());
        }
        self.persist(modpack_id)?;
        Ok(true)
    }

    /// Flip a member's enabled state, returning the new state.
    pub fn toggle(&mut self, modpack_id: &str, mod_id: &str) -> PackResult<bool> {
        let currently_enabled = {
            let pack = self.get(modpack_id)?;
            if !pack.is_member(mod_id) {
                return Err(PackError::ModNotFound(mod_id.to_string()));
            }
            pack.is_enabled(mod_id)
        };

        self.set_enabled(modpack_id, mod_id, !currently_enabled)?;
        Ok(!currently_enabled)
    }

    /// Replace the live membership and overlay wholesale (rollback support).
    /// The disabled set is re-intersected with the members to keep the
    /// subset invariant.
    pub fn set_membership(
        &mut self,
        modpack_id: &str,
        member_ids: Vec<String>,
        disabled_ids: BTreeSet<String>,
    ) -> PackResult<()> {
        let pack = self
            .packs
            .get_mut(modpack_id)
            .ok_or_else(|| PackError::ModpackNotFound(modpack_id.to_string()))?;

        pack.disabled_ids = disabled_ids
            .into_iter()
            .filter(|d| member_ids.iter().any(|m| m == d))
            .collect();
        pack.member_ids = member_ids;
        self.persist(modpack_id)
    }

    /// Strip a record id from every modpack (catalog deletion cascade).
    /// Returns the ids of the packs that referenced it.
    pub fn strip_everywhere(&mut self, mod_id: &str) -> PackResult<Vec<String>> {
        let affected: Vec<String> = self
            .packs
            .values()
            .filter(|p| p.is_member(mod_id))
            .map(|p| p.id.clone())
            .collect();

        for pack_id in &affected {
            if let Some(pack) = self.packs.get_mut(pack_id) {
                pack.member_ids.retain(|m| m != mod_id);
                pack.disabled_ids.remove(mod_id);
            }
            self.persist(pack_id)?;
            debug!("Stripped {} from modpack {}", mod_id, pack_id);
        }
        Ok(affected)
    }
}
