use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single membership change, derived by diffing two snapshots.
/// Never an independent source of truth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "mod_id", rename_all = "lowercase")]
pub enum Change {
    Add(String),
    Remove(String),
    Enable(String),
    Disable(String),
}

/// One commit in a modpack's linear history: a full copy of the membership
/// and overlay at that point, plus the derived change list against the
/// parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSnapshot {
    /// Monotonic id: `v1`, `v2`, ...
    pub id: String,
    /// Exactly one parent, `None` only for `v1`. No branches.
    pub parent: Option<String>,
    /// Semantic version tag; auto patch-bumped when not supplied.
    pub tag: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub member_ids: Vec<String>,
    pub disabled_ids: BTreeSet<String>,
    /// Always recomputed from the diff against the parent, never hand-edited.
    pub changes: Vec<Change>,
}

/// Per-modpack history document (`history/<id>.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionHistory {
    pub modpack_id: String,
    pub head: Option<String>,
    pub snapshots: Vec<VersionSnapshot>,
}

impl VersionHistory {
    pub fn find(&self, version_id: &str) -> Option<&VersionSnapshot> {
        self.snapshots.iter().find(|s| s.id == version_id)
    }

    pub fn head_snapshot(&self) -> Option<&VersionSnapshot> {
        self.head.as_deref().and_then(|id| self.find(id))
    }
}

/// Diff two membership states. Adds and removes come from the member delta;
/// enable/disable only for ids present on both sides.
pub fn compute_changes(
    old_members: &[String],
    old_disabled: &BTreeSet<String>,
    new_members: &[String],
    new_disabled: &BTreeSet<String>,
) -> Vec<Change> {
    let mut changes = Vec::new();

    for id in new_members {
        if !old_members.contains(id) {
            changes.push(Change::Add(id.clone()));
        }
    }
    for id in old_members {
        if !new_members.contains(id) {
            changes.push(Change::Remove(id.clone()));
        }
    }
    for id in new_members {
        if !old_members.contains(id) {
            continue;
        }
        match (old_disabled.contains(id), new_disabled.contains(id)) {
            (true, false) => changes.push(Change::Enable(id.clone())),
            (false, true) => changes.push(Change::Disable(id.clone())),
            _ => {}
        }
    }

    changes
}
