mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::core::error::PackResult;

/// Injectable document store. Each entity is one serialized document under a
/// slash-separated key (`catalog`, `modpacks/<id>`, `history/<id>`).
///
/// Handed explicitly to every component constructor so tests can swap in
/// [`MemoryStore`].
pub trait DocumentStore: Send + Sync {
    /// Raw document contents, `None` when the key does not exist.
    fn read(&self, key: &str) -> PackResult<Option<String>>;

    /// Atomic write: readers never observe partial contents.
    fn write(&self, key: &str, contents: &str) -> PackResult<()>;

    fn remove(&self, key: &str) -> PackResult<()>;

    /// Rename a malformed document aside so the rest of the store stays
    /// usable. The document is no longer visible to `read` afterwards.
    fn quarantine(&self, key: &str) -> PackResult<()>;

    /// Keys directly under `prefix` (no recursion).
    fn list(&self, prefix: &str) -> PackResult<Vec<String>>;
}

/// Load and deserialize a document, recovering from trailing corruption.
///
/// A document that fails to parse is first trimmed back to its last valid
/// structural boundary; if that yields a parseable prefix the trimmed
/// contents are written back. Otherwise the document is quarantined and the
/// caller sees `None` instead of an error.
pub fn load_json<T: DeserializeOwned + Serialize>(
    store: &dyn DocumentStore,
    key: &str,
) -> PackResult<Option<T>> {
    let Some(raw) = store.read(key)? else {
        return Ok(None);
    };

    match serde_json::from_str::<T>(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(parse_err) => {
            if let Some(recovered) = recover_truncated::<T>(&raw) {
                warn!(
                    "Document '{}' was malformed ({}); recovered by truncation",
                    key, parse_err
                );
                save_json(store, key, &recovered)?;
                return Ok(Some(recovered));
            }

            warn!(
                "Document '{}' is unrecoverable ({}); quarantining",
                key, parse_err
            );
            store.quarantine(key)?;
            Ok(None)
        }
    }
}

/// Serialize and atomically persist a document.
pub fn save_json<T: Serialize>(store: &dyn DocumentStore, key: &str, value: &T) -> PackResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    store.write(key, &json)
}

/// Trim trailing garbage back to the last `}` that closes a parseable
/// document. Handles the common partial-write case where a tail was lost.
fn recover_truncated<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let bytes = raw.as_bytes();
    for idx in (0..bytes.len()).rev() {
        if bytes[idx] != b'}' {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<T>(&raw[..=idx]) {
            return Some(value);
        }
    }
    None
}
