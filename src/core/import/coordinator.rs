use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::core::catalog::{CatalogStore, ModRecord};
use crate::core::error::{PackError, PackResult};
use crate::core::history::{VersionControl, VersionSnapshot};
use crate::core::import::{ManifestEntry, PackManifest};
use crate::core::modpack::ModpackStore;
use crate::core::resolver::ContentResolver;

/// A version collision found while scanning a manifest: the incoming
/// reference and the already-catalogued record from the same project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConflict {
    pub incoming: ManifestEntry,
    pub existing: ModRecord,
}

/// Caller-supplied decision for one conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Keep the local version, discard the incoming reference.
    UseExisting,
    /// Register the incoming version; the supersede rule replaces the old
    /// one in the target modpack.
    UseNew,
}

/// Serializable partial state for a halted import. Abandoned tokens must be
/// discarded explicitly via [`ImportCoordinator::discard`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportToken {
    pub id: String,
    pub modpack_id: String,
    pub pack_name: String,
    pub ready: Vec<ManifestEntry>,
    pub conflicts: Vec<ImportConflict>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    /// Records newly registered in the catalog.
    pub added: usize,
    /// References satisfied by existing catalog records (no fetch).
    pub reused: usize,
    pub member_ids: Vec<String>,
    /// The snapshot capturing the whole import as one history entry.
    pub snapshot: VersionSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub enum ImportOutcome {
    Completed(ImportResult),
    /// Conflicts were collected; the target modpack was not touched.
    Conflicted {
        token_id: String,
        conflicts: Vec<ImportConflict>,
    },
}

/// Drives bringing an externally authored pack definition into the catalog
/// and a target modpack: Scanning → (Clean | Conflicted) → Resolved.
#[derive(Default)]
pub struct ImportCoordinator {
    tokens: BTreeMap<String, ImportToken>,
}

impl ImportCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan a manifest against the catalog. A clean scan is applied
    /// immediately; any version conflict halts the import before the target
    /// modpack is mutated and hands back a resolution token.
    pub async fn begin(
        &mut self,
        catalog: &mut CatalogStore,
        packs: &mut ModpackStore,
        versions: &mut VersionControl,
        resolver: &dyn ContentResolver,
        modpack_id: &str,
        manifest: PackManifest,
    ) -> PackResult<ImportOutcome> {
        packs.get(modpack_id)?;

        let mut ready = Vec::new();
        let mut conflicts = Vec::new();

        for entry in manifest.entries {
            let key = entry.source.key();
            if catalog.find_by_key(&key).is_some() {
                ready.push(entry);
                continue;
            }

            let conflicting = entry
                .source
                .project_key()
                .and_then(|pk| catalog.find_by_project(&pk).first().map(|r| (*r).clone()));
            match conflicting {
                Some(existing) => conflicts.push(ImportConflict {
                    incoming: entry,
                    existing,
                }),
                None => ready.push(entry),
            }
        }

        if conflicts.is_empty() {
            let result = self
                .apply_entries(
                    catalog,
                    packs,
                    versions,
                    resolver,
                    modpack_id,
                    &manifest.name,
                    ready,
                    Vec::new(),
                )
                .await?;
            return Ok(ImportOutcome::Completed(result));
        }

        let token = ImportToken {
            id: Uuid::new_v4().to_string(),
            modpack_id: modpack_id.to_string(),
            pack_name: manifest.name,
            ready,
            conflicts: conflicts.clone(),
            created_at: Utc::now(),
        };
        info!(
            "Import of '{}' halted: {} conflict(s), token {}",
            token.pack_name,
            conflicts.len(),
            token.id
        );
        let token_id = token.id.clone();
        self.tokens.insert(token_id.clone(), token);

        Ok(ImportOutcome::Conflicted {
            token_id,
            conflicts,
        })
    }

    /// Apply caller-supplied resolutions for a halted import. Resolutions
    /// are positional against the token's conflict list and must cover all
    /// of it. The whole import lands as a single version-history entry.
    ///
    /// The token is consumed only on success; after a failed resolve it
    /// stays pending and can be retried or discarded.
    pub async fn resolve(
        &mut self,
        catalog: &mut CatalogStore,
        packs: &mut ModpackStore,
        versions: &mut VersionControl,
        resolver: &dyn ContentResolver,
        token_id: &str,
        resolutions: &[Resolution],
    ) -> PackResult<ImportResult> {
        let token = self
            .tokens
            .get(token_id)
            .ok_or_else(|| PackError::TokenNotFound(token_id.to_string()))?;

        if resolutions.len() != token.conflicts.len() {
            let missing = token.conflicts.len().saturating_sub(resolutions.len());
            return Err(PackError::UnresolvedConflicts(missing.max(1)));
        }

        let mut resolved = Vec::new();
        for (conflict, resolution) in token.conflicts.iter().zip(resolutions) {
            match resolution {
                Resolution::UseExisting => resolved.push(Reference::Existing(conflict.existing.id.clone())),
                Resolution::UseNew => resolved.push(Reference::Incoming(conflict.incoming.clone())),
            }
        }
        let ready = token.ready.clone();
        let modpack_id = token.modpack_id.clone();
        let pack_name = token.pack_name.clone();

        let result = self
            .apply_entries(
                catalog,
                packs,
                versions,
                resolver,
                &modpack_id,
                &pack_name,
                ready,
                resolved,
            )
            .await?;

        self.tokens.remove(token_id);
        Ok(result)
    }

    /// Drop an abandoned token. Returns `false` when unknown.
    pub fn discard(&mut self, token_id: &str) -> bool {
        self.tokens.remove(token_id).is_some()
    }

    pub fn pending(&self) -> impl Iterator<Item = &ImportToken> {
        self.tokens.values()
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_entries(
        &mut self,
        catalog: &mut CatalogStore,
        packs: &mut ModpackStore,
        versions: &mut VersionControl,
        resolver: &dyn ContentResolver,
        modpack_id: &str,
        pack_name: &str,
        ready: Vec<ManifestEntry>,
        resolved: Vec<Reference>,
    ) -> PackResult<ImportResult> {
        let (game_version, loader) = {
            let def = packs.get(modpack_id)?;
            (def.game_version.clone(), def.loader)
        };

        // Build every record up front so a resolution failure leaves the
        // modpack untouched.
        let mut drafts = Vec::new();
        for entry in ready.into_iter().chain(resolved.iter().filter_map(|r| match r {
            Reference::Incoming(entry) => Some(entry.clone()),
            Reference::Existing(_) => None,
        })) {
            if let Some(existing) = catalog.find_by_key(&entry.source.key()) {
                drafts.push(Draft::Reuse(existing.id.clone()));
                continue;
            }

            let filename = match &entry.filename {
                Some(name) => name.clone(),
                None => {
                    let project_key = entry.source.project_key().ok_or_else(|| {
                        PackError::Other(format!("entry '{}' has neither filename nor project", entry.name))
                    })?;
                    resolver
                        .find_compatible_file(&project_key, &game_version, loader)
                        .await?
                        .map(|f| f.filename)
                        .ok_or_else(|| {
                            PackError::Other(format!(
                                "no compatible file for '{}' ({} / {})",
                                entry.name, game_version, loader
                            ))
                        })?
                }
            };

            let record = ModRecord::new(
                entry.source.clone(),
                entry.name.clone(),
                entry.version.clone(),
                entry.bucket,
                filename,
            )
            .with_loader(loader)
            .with_game_version(game_version.clone());
            drafts.push(Draft::Register(record));
        }

        let mut result_ids = Vec::new();
        let mut added = 0;
        let mut reused = 0;

        for draft in drafts {
            let record = match draft {
                Draft::Reuse(id) => {
                    reused += 1;
                    catalog.get(&id)?.clone()
                }
                Draft::Register(record) => {
                    added += 1;
                    catalog.upsert(record)?
                }
            };
            packs.add_member(modpack_id, &record, catalog)?;
            result_ids.push(record.id);
        }
        for reference in &resolved {
            if let Reference::Existing(id) = reference {
                reused += 1;
                let record = catalog.get(id)?.clone();
                packs.add_member(modpack_id, &record, catalog)?;
                result_ids.push(record.id);
            }
        }

        let def = packs.get(modpack_id)?.clone();
        let snapshot = versions.commit(&def, &format!("Import '{pack_name}'"), None)?;

        info!(
            "Imported '{}' into modpack {}: {} added, {} reused",
            pack_name, modpack_id, added, reused
        );
        Ok(ImportResult {
            added,
            reused,
            member_ids: result_ids,
            snapshot,
        })
    }
}

enum Reference {
    Existing(String),
    Incoming(ManifestEntry),
}

enum Draft {
    Reuse(String),
    Register(ModRecord),
}
