mod record;
mod store;

pub use record::{ContentBucket, LoaderKind, ModRecord, SourceRef};
pub use store::CatalogStore;
