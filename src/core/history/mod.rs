mod control;
mod snapshot;

pub use control::VersionControl;
pub use snapshot::{compute_changes, Change, VersionHistory, VersionSnapshot};
