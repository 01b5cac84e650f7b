use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::core::error::{PackError, PackResult};
use crate::core::history::{compute_changes, Change, VersionHistory, VersionSnapshot};
use crate::core::modpack::ModpackDefinition;
use crate::core::storage::{self, DocumentStore};

fn doc_key(modpack_id: &str) -> String {
    format!("history/{modpack_id}")
}

/// Bump the patch component of `X.Y.Z`. Non-semver tags restart at the
/// initial tag.
fn bump_patch(tag: &str) -> String {
    let parts: Vec<&str> = tag.split('.').collect();
    if parts.len() == 3 {
        if let (Ok(major), Ok(minor), Ok(patch)) = (
            parts[0].parse::<u64>(),
            parts[1].parse::<u64>(),
            parts[2].parse::<u64>(),
        ) {
            return format!("{major}.{minor}.{}", patch + 1);
        }
    }
    INITIAL_TAG.to_string()
}

const INITIAL_TAG: &str = "0.1.0";

/// Linear, git-like commit history per modpack.
///
/// Histories are never rewritten, only extended; the head pointer advances
/// one snapshot at a time.
pub struct VersionControl {
    storage: Arc<dyn DocumentStore>,
    histories: BTreeMap<String, VersionHistory>,
}

impl VersionControl {
    pub fn load(storage: Arc<dyn DocumentStore>) -> PackResult<Self> {
        let mut histories = BTreeMap::new();
        for key in storage.list("history")? {
            if let Some(history) = storage::load_json::<VersionHistory>(storage.as_ref(), &key)? {
                histories.insert(history.modpack_id.clone(), history);
            }
        }
        Ok(Self { storage, histories })
    }

    fn persist(&self, modpack_id: &str) -> PackResult<()> {
        let history = self
            .histories
            .get(modpack_id)
            .ok_or_else(|| PackError::ModpackNotFound(modpack_id.to_string()))?;
        storage::save_json(self.storage.as_ref(), &doc_key(modpack_id), history)
    }

    pub fn has_history(&self, modpack_id: &str) -> bool {
        self.histories.contains_key(modpack_id)
    }

    pub fn history(&self, modpack_id: &str) -> PackResult<&VersionHistory> {
        self.histories
            .get(modpack_id)
            .ok_or_else(|| PackError::ModpackNotFound(modpack_id.to_string()))
    }

    pub fn head(&self, modpack_id: &str) -> PackResult<&VersionSnapshot> {
        self.history(modpack_id)?
            .head_snapshot()
            .ok_or_else(|| PackError::VersionNotFound {
                modpack: modpack_id.to_string(),
                version: "HEAD".to_string(),
            })
    }

    pub fn snapshot(&self, modpack_id: &str, version_id: &str) -> PackResult<&VersionSnapshot> {
        self.history(modpack_id)?
            .find(version_id)
            .ok_or_else(|| PackError::VersionNotFound {
                modpack: modpack_id.to_string(),
                version: version_id.to_string(),
            })
    }

    /// Create the implicit `v1` snapshot capturing the current membership.
    /// No-op returning the existing head when history already exists.
    pub fn initialize(
        &mut self,
        def: &ModpackDefinition,
        message: &str,
    ) -> PackResult<VersionSnapshot> {
        if let Some(history) = self.histories.get(&def.id) {
            if let Some(head) = history.head_snapshot() {
                return Ok(head.clone());
            }
        }

        let changes = compute_changes(
            &[],
            &Default::default(),
            &def.member_ids,
            &def.disabled_ids,
        );
        let snapshot = VersionSnapshot {
            id: "v1".to_string(),
            parent: None,
            tag: INITIAL_TAG.to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
            member_ids: def.member_ids.clone(),
            disabled_ids: def.disabled_ids.clone(),
            changes,
        };

        self.histories.insert(
            def.id.clone(),
            VersionHistory {
                modpack_id: def.id.clone(),
                head: Some(snapshot.id.clone()),
                snapshots: vec![snapshot.clone()],
            },
        );
        self.persist(&def.id)?;

        info!("Initialized history for modpack {} at v1", def.id);
        Ok(snapshot)
    }

    /// Commit the current membership against the head.
    ///
    /// Auto-initializes on first use. An empty diff returns the current head
    /// without creating a snapshot.
    pub fn commit(
        &mut self,
        def: &ModpackDefinition,
        message: &str,
        tag: Option<String>,
    ) -> PackResult<VersionSnapshot> {
        let head = match self.histories.get(&def.id).and_then(|h| h.head_snapshot()) {
            Some(head) => head.clone(),
            None => return self.initialize(def, message),
        };

        let changes = compute_changes(
            &head.member_ids,
            &head.disabled_ids,
            &def.member_ids,
            &def.disabled_ids,
        );
        if changes.is_empty() {
            debug!(
                "Commit on modpack {} suppressed: no membership change",
                def.id
            );
            return Ok(head);
        }

        let history = self
            .histories
            .get_mut(&def.id)
            .ok_or_else(|| PackError::ModpackNotFound(def.id.clone()))?;

        let snapshot = VersionSnapshot {
            id: format!("v{}", history.snapshots.len() + 1),
            parent: Some(head.id.clone()),
            tag: tag.unwrap_or_else(|| bump_patch(&head.tag)),
            message: message.to_string(),
            created_at: Utc::now(),
            member_ids: def.member_ids.clone(),
            disabled_ids: def.disabled_ids.clone(),
            changes,
        };

        history.head = Some(snapshot.id.clone());
        history.snapshots.push(snapshot.clone());
        self.persist(&def.id)?;

        info!(
            "Committed {} ({}) on modpack {}: {} change(s)",
            snapshot.id,
            snapshot.tag,
            def.id,
            snapshot.changes.len()
        );
        Ok(snapshot)
    }

    /// Recompute the change list between two stored snapshots, independent
    /// of their recorded `changes`.
    pub fn diff(&self, modpack_id: &str, from: &str, to: &str) -> PackResult<Vec<Change>> {
        let from_snap = self.snapshot(modpack_id, from)?;
        let to_snap = self.snapshot(modpack_id, to)?;
        Ok(compute_changes(
            &from_snap.member_ids,
            &from_snap.disabled_ids,
            &to_snap.member_ids,
            &to_snap.disabled_ids,
        ))
    }

    /// Drop a modpack's history document (modpack deletion cascade).
    pub fn delete(&mut self, modpack_id: &str) -> PackResult<bool> {
        if self.histories.remove(modpack_id).is_none() {
            return Ok(false);
        }
        self.storage.remove(&doc_key(modpack_id))?;
        Ok(true)
    }
}
