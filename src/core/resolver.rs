use async_trait::async_trait;

use crate::core::catalog::{LoaderKind, SourceRef};
use crate::core::error::PackResult;

/// A concrete upstream file located for a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub source: SourceRef,
    pub filename: String,
}

/// Best-effort identification of a content archive.
#[derive(Debug, Clone, Default)]
pub struct ModMetadata {
    pub name: Option<String>,
    pub version: Option<String>,
    pub loader: Option<LoaderKind>,
    pub game_version: Option<String>,
}

/// Seam to the per-catalog network clients. The core treats every upstream
/// source uniformly through this trait and never speaks a catalog protocol
/// itself.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    /// Fetch the raw bytes for a catalogued reference.
    async fn fetch(&self, source: &SourceRef) -> PackResult<Vec<u8>>;

    /// Locate a file of the given project compatible with a target runtime
    /// and loader. `None` when the project publishes nothing compatible.
    async fn find_compatible_file(
        &self,
        project_key: &str,
        game_version: &str,
        loader: LoaderKind,
    ) -> PackResult<Option<FileRef>>;
}

/// Seam to the external archive sniffer ("what mod is this file"). The core
/// never parses archive formats.
pub trait MetadataResolver: Send + Sync {
    fn identify(&self, bytes: &[u8]) -> Option<ModMetadata>;
}
