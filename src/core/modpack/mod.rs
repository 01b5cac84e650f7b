mod model;
mod store;

pub use model::{ModpackDefinition, RemoteSource};
pub use store::ModpackStore;
