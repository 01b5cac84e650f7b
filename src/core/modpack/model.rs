use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::catalog::LoaderKind;

/// Upstream location a modpack definition can be pulled from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSource {
    pub url: String,
    pub last_checked: Option<DateTime<Utc>>,
}

/// A named, versioned set of catalogued content, persisted to disk as
/// `modpacks/<id>.json`.
///
/// `member_ids` keeps insertion order but holds no duplicates;
/// `disabled_ids` is always a subset of it (the enabled/disabled overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModpackDefinition {
    pub id: String,
    pub name: String,
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub disabled_ids: BTreeSet<String>,
    /// Target runtime version (e.g. "1.21.1").
    pub game_version: String,
    pub loader: LoaderKind,
    #[serde(default)]
    pub description: String,
    pub remote: Option<RemoteSource>,
    pub created_at: DateTime<Utc>,
}

impl ModpackDefinition {
    pub fn new(name: impl Into<String>, game_version: impl Into<String>, loader: LoaderKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            member_ids: Vec::new(),
            disabled_ids: BTreeSet::new(),
            game_version: game_version.into(),
            loader,
            description: String::new(),
            remote: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_member(&self, mod_id: &str) -> bool {
        self.member_ids.iter().any(|m| m == mod_id)
    }

    pub fn is_enabled(&self, mod_id: &str) -> bool {
        self.is_member(mod_id) && !self.disabled_ids.contains(mod_id)
    }
}
