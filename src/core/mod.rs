// ─── packvault core ───
// Backend for modpack curation, version history and instance sync.
//
// Architecture:
//   core/
//     catalog/    - ModRecord table, deduplicated by source key
//     modpack/    - ModpackDefinition + membership/overlay operations
//     history/    - linear commit history per modpack
//     reconcile/  - instance probe, plan computation, concurrent apply
//     import/     - cross-source import with conflict resolution
//     storage/    - injectable document store (atomic disk / in-memory)
//     resolver    - external seams: content fetch + metadata sniffing
//     sync        - remote-source manifest pull
//     manager     - PackManager facade wiring the stores together

pub mod catalog;
pub mod error;
pub mod history;
pub mod http;
pub mod import;
pub mod manager;
pub mod modpack;
pub mod reconcile;
pub mod resolver;
pub mod storage;
pub mod sync;
