mod coordinator;
mod manifest;

pub use coordinator::{
    ImportConflict, ImportCoordinator, ImportOutcome, ImportResult, ImportToken, Resolution,
};
pub use manifest::{ManifestEntry, PackManifest};
