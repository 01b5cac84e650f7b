mod apply;
mod plan;
mod state;

pub use apply::{apply, ApplyOptions, ApplyReport, ConfigSyncMode};
pub use plan::{plan, MissingEntry, ObsoleteEntry, ReconciliationPlan, ToggleEntry};
pub use state::{FilePresence, InstanceState, DISABLED_SUFFIX};
