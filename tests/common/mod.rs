// Not every integration test exercises every helper here.
#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;

use packvault::core::catalog::{ContentBucket, LoaderKind, ModRecord, SourceRef};
use packvault::core::error::{PackError, PackResult};
use packvault::core::resolver::{ContentResolver, FileRef};

/// Test double standing in for the per-catalog network clients: bytes are
/// served from an in-memory map keyed by source key.
#[derive(Default)]
pub struct FakeResolver {
    pub files: HashMap<String, Vec<u8>>,
    pub compatible: HashMap<String, FileRef>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serving(mut self, key: &str, bytes: &[u8]) -> Self {
        self.files.insert(key.to_string(), bytes.to_vec());
        self
    }

    #[allow(dead_code)]
    pub fn locating(mut self, project_key: &str, file: FileRef) -> Self {
        self.compatible.insert(project_key.to_string(), file);
        self
    }
}

#[async_trait]
impl ContentResolver for FakeResolver {
    async fn fetch(&self, source: &SourceRef) -> PackResult<Vec<u8>> {
        self.files
            .get(&source.key())
            .cloned()
            .ok_or_else(|| PackError::DownloadFailed {
                url: source.key(),
                status: 404,
            })
    }

    async fn find_compatible_file(
        &self,
        project_key: &str,
        _game_version: &str,
        _loader: LoaderKind,
    ) -> PackResult<Option<FileRef>> {
        Ok(self.compatible.get(project_key).cloned())
    }
}

pub fn cf_record(project: &str, file: &str, filename: &str) -> ModRecord {
    ModRecord::new(
        SourceRef::CurseForge {
            project_id: project.into(),
            file_id: file.into(),
        },
        format!("proj-{project}"),
        file,
        ContentBucket::Mod,
        filename,
    )
    .with_loader(LoaderKind::Fabric)
    .with_game_version("1.21.1")
}
