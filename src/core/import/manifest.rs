use serde::{Deserialize, Serialize};

use crate::core::catalog::{ContentBucket, LoaderKind, SourceRef};

fn default_bucket() -> ContentBucket {
    ContentBucket::Mod
}

/// One referenced item in an externally authored pack definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(flatten)]
    pub source: SourceRef,
    pub name: String,
    pub version: String,
    /// Absent when the authoring tool did not record a concrete filename;
    /// resolved through the content resolver at import time.
    pub filename: Option<String>,
    #[serde(default = "default_bucket")]
    pub bucket: ContentBucket,
}

/// Externally authored pack definition brought in through the import flow,
/// e.g. pulled from a modpack's remote source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackManifest {
    pub name: String,
    pub game_version: Option<String>,
    pub loader: Option<LoaderKind>,
    #[serde(default)]
    pub entries: Vec<ManifestEntry>,
}
