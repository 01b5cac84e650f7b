use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the entire backend.
/// Every module returns `Result<T, PackError>`.
#[derive(Debug, Error)]
pub enum PackError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Lookups (returned, never fatal to the caller) ───
    #[error("Modpack not found: {0}")]
    ModpackNotFound(String),

    #[error("Mod record not found: {0}")]
    ModNotFound(String),

    #[error("Version {version} not found for modpack {modpack}")]
    VersionNotFound { modpack: String, version: String },

    #[error("Import token not found: {0}")]
    TokenNotFound(String),

    // ── Import ──────────────────────────────────────────
    #[error("{0} import conflict(s) left without a resolution")]
    UnresolvedConflicts(usize),

    // ── Structural (the only class that aborts a call) ──
    #[error("Instance directory unresolvable: {0:?}")]
    InstanceUnresolvable(PathBuf),

    // ── Storage ─────────────────────────────────────────
    #[error("Storage error: {0}")]
    Storage(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type PackResult<T> = Result<T, PackError>;

impl From<std::io::Error> for PackError {
    fn from(source: std::io::Error) -> Self {
        PackError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// ── Serialization for IPC layers ────────────────────────
// Embedding frontends ship errors as their display string.
impl serde::Serialize for PackError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
