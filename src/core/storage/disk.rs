use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use crate::core::error::{PackError, PackResult};
use crate::core::storage::DocumentStore;

/// On-disk document store rooted at a data directory.
///
/// Keys map to `<root>/<key>.json`. Writes go through a sibling `.tmp` file
/// followed by a rename so readers never observe partial contents.
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PackError + '_ {
    move |source| PackError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl DocumentStore for DiskStore {
    fn read(&self, key: &str) -> PackResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PackError::Io { path, source: e }),
        }
    }

    fn write(&self, key: &str, contents: &str) -> PackResult<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(io_err(&tmp))?;
        fs::rename(&tmp, &path).map_err(io_err(&path))?;

        debug!("Wrote document '{}' ({} bytes)", key, contents.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> PackResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PackError::Io { path, source: e }),
        }
    }

    fn quarantine(&self, key: &str) -> PackResult<()> {
        let path = self.path_for(key);
        let aside = path.with_extension(format!("json.corrupt-{}", Utc::now().timestamp()));
        fs::rename(&path, &aside).map_err(io_err(&path))?;
        Ok(())
    }

    fn list(&self, prefix: &str) -> PackResult<Vec<String>> {
        let dir = self.root.join(prefix);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir).map_err(io_err(&dir))? {
            let entry = entry.map_err(io_err(&dir))?;
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(format!("{prefix}/{stem}"));
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
