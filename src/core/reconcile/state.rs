use std::collections::BTreeMap;
use std::path::Path;

use crate::core::catalog::ContentBucket;
use crate::core::error::{PackError, PackResult};

/// Marker suffix for physically disabled content. Toggling is purely a
/// rename, no content transfer.
pub const DISABLED_SUFFIX: &str = ".disabled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePresence {
    Enabled,
    Disabled,
}

/// What actually exists on disk for an instance, per content bucket.
/// A probe result only, never persisted.
#[derive(Debug, Clone, Default)]
pub struct InstanceState {
    buckets: BTreeMap<ContentBucket, BTreeMap<String, FilePresence>>,
}

impl InstanceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file. `filename` is the logical name, without the disabled
    /// marker.
    pub fn insert(&mut self, bucket: ContentBucket, filename: impl Into<String>, presence: FilePresence) {
        self.buckets
            .entry(bucket)
            .or_default()
            .insert(filename.into(), presence);
    }

    pub fn presence(&self, bucket: ContentBucket, filename: &str) -> Option<FilePresence> {
        self.buckets.get(&bucket).and_then(|m| m.get(filename)).copied()
    }

    pub fn files(&self, bucket: ContentBucket) -> impl Iterator<Item = (&str, FilePresence)> {
        self.buckets
            .get(&bucket)
            .into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(|m| m.is_empty())
    }

    /// Scan an instance directory. Bucket subdirectories that don't exist
    /// simply contribute nothing; a missing instance directory is the
    /// structural failure class.
    pub async fn probe(instance_dir: &Path) -> PackResult<Self> {
        if !instance_dir.is_dir() {
            return Err(PackError::InstanceUnresolvable(instance_dir.to_path_buf()));
        }

        let mut state = Self::new();
        for bucket in ContentBucket::ALL {
            let dir = instance_dir.join(bucket.dir_name());
            if !dir.is_dir() {
                continue;
            }

            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|source| PackError::Io {
                    path: dir.clone(),
                    source,
                })?;
            while let Some(entry) = entries.next_entry().await.map_err(|source| PackError::Io {
                path: dir.clone(),
                source,
            })? {
                if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().to_string();
                match name.strip_suffix(DISABLED_SUFFIX) {
                    Some(logical) => state.insert(bucket, logical, FilePresence::Disabled),
                    None => state.insert(bucket, name, FilePresence::Enabled),
                }
            }
        }

        Ok(state)
    }
}
