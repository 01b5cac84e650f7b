pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::error::{PackError, PackResult};
pub use crate::core::manager::PackManager;

/// Initialize structured logging for embedders that don't install their own
/// subscriber.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,packvault=debug")),
        )
        .init();
}
