use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::warn;

use crate::core::catalog::{CatalogStore, ContentBucket, SourceRef};
use crate::core::modpack::ModpackDefinition;
use crate::core::reconcile::{FilePresence, InstanceState};

/// A member that must be fetched. Disabled members are fetched too and
/// written with the disabled marker, so a later toggle needs no re-fetch.
#[derive(Debug, Clone, Serialize)]
pub struct MissingEntry {
    pub mod_id: String,
    pub source: SourceRef,
    pub bucket: ContentBucket,
    pub filename: String,
    pub want_enabled: bool,
}

/// A physically present member whose enabled state disagrees with the
/// overlay. Realized as a rename.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleEntry {
    pub bucket: ContentBucket,
    pub filename: String,
    pub want_enabled: bool,
}

/// An untracked physical file. Only ever listed under `clear_existing`;
/// user-added files are preserved otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct ObsoleteEntry {
    pub bucket: ContentBucket,
    pub filename: String,
    pub disabled: bool,
}

/// The delta between a modpack's logical state and an instance's physical
/// state. Always recomputable, never persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationPlan {
    pub missing: Vec<MissingEntry>,
    pub toggle: Vec<ToggleEntry>,
    pub obsolete: Vec<ObsoleteEntry>,
    pub clear_existing: bool,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.toggle.is_empty() && self.obsolete.is_empty()
    }
}

/// Pure plan computation. Calling this again right after a fully successful
/// apply yields an empty plan.
pub fn plan(
    def: &ModpackDefinition,
    catalog: &CatalogStore,
    state: &InstanceState,
    clear_existing: bool,
) -> ReconciliationPlan {
    let mut result = ReconciliationPlan {
        clear_existing,
        ..Default::default()
    };
    let mut tracked: BTreeMap<ContentBucket, BTreeSet<&str>> = BTreeMap::new();

    for mod_id in &def.member_ids {
        let record = match catalog.get(mod_id) {
            Ok(r) => r,
            Err(_) => {
                warn!(
                    "Member {} of modpack {} has no catalog record; skipping",
                    mod_id, def.id
                );
                continue;
            }
        };
        tracked
            .entry(record.bucket)
            .or_default()
            .insert(record.filename.as_str());

        let want_enabled = def.is_enabled(mod_id);
        match state.presence(record.bucket, &record.filename) {
            None => result.missing.push(MissingEntry {
                mod_id: mod_id.clone(),
                source: record.source.clone(),
                bucket: record.bucket,
                filename: record.filename.clone(),
                want_enabled,
            }),
            Some(presence) => {
                let enabled = presence == FilePresence::Enabled;
                if enabled != want_enabled {
                    result.toggle.push(ToggleEntry {
                        bucket: record.bucket,
                        filename: record.filename.clone(),
                        want_enabled,
                    });
                }
            }
        }
    }

    if clear_existing {
        for bucket in ContentBucket::ALL {
            let tracked_names = tracked.get(&bucket);
            for (filename, presence) in state.files(bucket) {
                if tracked_names.map(|t| t.contains(filename)).unwrap_or(false) {
                    continue;
                }
                result.obsolete.push(ObsoleteEntry {
                    bucket,
                    filename: filename.to_string(),
                    disabled: presence == FilePresence::Disabled,
                });
            }
        }
    }

    result
}
