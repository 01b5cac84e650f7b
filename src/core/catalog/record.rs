use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported mod loaders, strongly typed rather than magic strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    Vanilla,
    Forge,
    Fabric,
    NeoForge,
    Quilt,
}

impl std::fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderKind::Vanilla => write!(f, "vanilla"),
            LoaderKind::Forge => write!(f, "forge"),
            LoaderKind::Fabric => write!(f, "fabric"),
            LoaderKind::NeoForge => write!(f, "neoforge"),
            LoaderKind::Quilt => write!(f, "quilt"),
        }
    }
}

/// Which instance subdirectory a piece of content lands in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContentBucket {
    Mod,
    ResourcePack,
    ShaderPack,
}

impl ContentBucket {
    pub const ALL: [ContentBucket; 3] = [
        ContentBucket::Mod,
        ContentBucket::ResourcePack,
        ContentBucket::ShaderPack,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            ContentBucket::Mod => "mods",
            ContentBucket::ResourcePack => "resourcepacks",
            ContentBucket::ShaderPack => "shaderpacks",
        }
    }
}

/// Upstream identity of a record, resolved once at ingestion.
///
/// Downstream logic never re-inspects raw optional manifest fields; it
/// matches on this union instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum SourceRef {
    CurseForge { project_id: String, file_id: String },
    Modrinth { project_id: String, version_id: String },
    Local { sha1: String },
}

impl SourceRef {
    /// Composite identity key. Two records with the same key are the same
    /// content.
    pub fn key(&self) -> String {
        match self {
            SourceRef::CurseForge {
                project_id,
                file_id,
            } => format!("curseforge:{project_id}:{file_id}"),
            SourceRef::Modrinth {
                project_id,
                version_id,
            } => format!("modrinth:{project_id}:{version_id}"),
            SourceRef::Local { sha1 } => format!("local:{sha1}"),
        }
    }

    /// Project-level key shared by all versions of the same upstream
    /// project. Local files have no project notion.
    pub fn project_key(&self) -> Option<String> {
        match self {
            SourceRef::CurseForge { project_id, .. } => Some(format!("curseforge:{project_id}")),
            SourceRef::Modrinth { project_id, .. } => Some(format!("modrinth:{project_id}")),
            SourceRef::Local { .. } => None,
        }
    }
}

/// A single piece of catalogued content. Immutable once created; re-adding
/// the same source key returns the existing record unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModRecord {
    pub id: String,
    pub source: SourceRef,
    pub name: String,
    pub version: String,
    pub loader: Option<LoaderKind>,
    /// Target runtime version (e.g. "1.21.1").
    pub game_version: Option<String>,
    pub bucket: ContentBucket,
    pub filename: String,
    /// Free-form display metadata (author, summary, icon URL, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl ModRecord {
    pub fn new(
        source: SourceRef,
        name: impl Into<String>,
        version: impl Into<String>,
        bucket: ContentBucket,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source,
            name: name.into(),
            version: version.into(),
            loader: None,
            game_version: None,
            bucket,
            filename: filename.into(),
            metadata: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_loader(mut self, loader: LoaderKind) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_game_version(mut self, game_version: impl Into<String>) -> Self {
        self.game_version = Some(game_version.into());
        self
    }

    pub fn source_key(&self) -> String {
        self.source.key()
    }
}
