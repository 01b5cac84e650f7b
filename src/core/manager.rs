use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use sha1::{Digest, Sha1};
use tracing::info;

use crate::core::catalog::{CatalogStore, ContentBucket, ModRecord, SourceRef};
use crate::core::error::{PackError, PackResult};
use crate::core::history::{VersionControl, VersionSnapshot};
use crate::core::import::{ImportCoordinator, ImportOutcome, ImportResult, PackManifest, Resolution};
use crate::core::modpack::ModpackStore;
use crate::core::reconcile::{self, InstanceState, ReconciliationPlan};
use crate::core::resolver::{ContentResolver, MetadataResolver};
use crate::core::storage::{DiskStore, DocumentStore, MemoryStore};

const APP_DIR_NAME: &str = "packvault";

/// Facade wiring the stores over one injected document store.
///
/// All cross-store cascades live here so the leaf stores stay free of
/// back-references (two one-directional indexes, no mutual pointers).
pub struct PackManager {
    pub catalog: CatalogStore,
    pub modpacks: ModpackStore,
    pub versions: VersionControl,
    pub imports: ImportCoordinator,
}

impl PackManager {
    pub fn open(storage: Arc<dyn DocumentStore>) -> PackResult<Self> {
        Ok(Self {
            catalog: CatalogStore::load(storage.clone())?,
            modpacks: ModpackStore::load(storage.clone())?,
            versions: VersionControl::load(storage)?,
            imports: ImportCoordinator::new(),
        })
    }

    /// Disk-backed manager at an explicit data directory.
    pub fn open_at(data_dir: PathBuf) -> PackResult<Self> {
        Self::open(Arc::new(DiskStore::new(data_dir)))
    }

    /// Disk-backed manager at the platform data directory.
    pub fn open_default() -> PackResult<Self> {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::open_at(base.join(APP_DIR_NAME))
    }

    /// Ephemeral manager for tests and dry runs.
    pub fn open_in_memory() -> PackResult<Self> {
        Self::open(Arc::new(MemoryStore::new()))
    }

    // ── Cross-store cascades ────────────────────────────

    /// Delete a catalog record and eagerly strip it from every modpack's
    /// membership and overlay.
    pub fn delete_record(&mut self, mod_id: &str) -> PackResult<bool> {
        if !self.catalog.remove(mod_id)? {
            return Ok(false);
        }
        let affected = self.modpacks.strip_everywhere(mod_id)?;
        info!(
            "Deleted record {} (stripped from {} modpack(s))",
            mod_id,
            affected.len()
        );
        Ok(true)
    }

    /// Delete a modpack together with its version history.
    pub fn delete_modpack(&mut self, modpack_id: &str) -> PackResult<bool> {
        let removed = self.modpacks.delete(modpack_id)?;
        if removed {
            self.versions.delete(modpack_id)?;
        }
        Ok(removed)
    }

    // ── Version control over the live definition ────────

    pub fn initialize_history(
        &mut self,
        modpack_id: &str,
        message: &str,
    ) -> PackResult<VersionSnapshot> {
        let def = self.modpacks.get(modpack_id)?.clone();
        self.versions.initialize(&def, message)
    }

    pub fn commit(
        &mut self,
        modpack_id: &str,
        message: &str,
        tag: Option<String>,
    ) -> PackResult<VersionSnapshot> {
        let def = self.modpacks.get(modpack_id)?.clone();
        self.versions.commit(&def, message, tag)
    }

    /// Restore a modpack's membership/overlay to a historical snapshot,
    /// intersected with `available` when some content can no longer be
    /// fetched. The restore itself is committed as a new forward-only
    /// entry; history is never rewritten.
    pub fn rollback(
        &mut self,
        modpack_id: &str,
        version_id: &str,
        available: Option<&BTreeSet<String>>,
    ) -> PackResult<VersionSnapshot> {
        let snapshot = self.versions.snapshot(modpack_id, version_id)?.clone();

        let member_ids: Vec<String> = snapshot
            .member_ids
            .iter()
            .filter(|id| available.map(|a| a.contains(*id)).unwrap_or(true))
            .cloned()
            .collect();
        // Disabled state is preserved on rollback (unlike supersede).
        let disabled_ids: BTreeSet<String> = snapshot
            .disabled_ids
            .iter()
            .filter(|id| member_ids.contains(id))
            .cloned()
            .collect();

        self.modpacks
            .set_membership(modpack_id, member_ids, disabled_ids)?;

        let def = self.modpacks.get(modpack_id)?.clone();
        self.versions
            .commit(&def, &format!("Rollback to {version_id}"), None)
    }

    // ── Reconciliation ──────────────────────────────────

    pub fn plan(
        &self,
        modpack_id: &str,
        state: &InstanceState,
        clear_existing: bool,
    ) -> PackResult<ReconciliationPlan> {
        let def = self.modpacks.get(modpack_id)?;
        Ok(reconcile::plan(def, &self.catalog, state, clear_existing))
    }

    // ── Import ──────────────────────────────────────────

    pub async fn begin_import(
        &mut self,
        resolver: &dyn ContentResolver,
        modpack_id: &str,
        manifest: PackManifest,
    ) -> PackResult<ImportOutcome> {
        self.imports
            .begin(
                &mut self.catalog,
                &mut self.modpacks,
                &mut self.versions,
                resolver,
                modpack_id,
                manifest,
            )
            .await
    }

    pub async fn resolve_import(
        &mut self,
        resolver: &dyn ContentResolver,
        token_id: &str,
        resolutions: &[Resolution],
    ) -> PackResult<ImportResult> {
        self.imports
            .resolve(
                &mut self.catalog,
                &mut self.modpacks,
                &mut self.versions,
                resolver,
                token_id,
                resolutions,
            )
            .await
    }

    // ── Local files ─────────────────────────────────────

    /// Catalogue a local file: content-hash it, let the external sniffer
    /// identify it, and upsert a `Local` record keyed by the hash.
    pub fn register_local_file(
        &mut self,
        filename: &str,
        bytes: &[u8],
        bucket: ContentBucket,
        sniffer: &dyn MetadataResolver,
    ) -> PackResult<ModRecord> {
        if filename.is_empty() {
            return Err(PackError::Other("local file needs a filename".into()));
        }

        let mut hasher = Sha1::new();
        hasher.update(bytes);
        let sha1 = hex::encode(hasher.finalize());

        let identified = sniffer.identify(bytes).unwrap_or_default();
        let name = identified
            .name
            .unwrap_or_else(|| filename.trim_end_matches(".jar").to_string());
        let version = identified.version.unwrap_or_else(|| "unknown".to_string());

        let mut record = ModRecord::new(SourceRef::Local { sha1 }, name, version, bucket, filename);
        record.loader = identified.loader;
        record.game_version = identified.game_version;

        self.catalog.upsert(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::LoaderKind;
    use crate::core::resolver::ModMetadata;

    struct StubSniffer;

    impl MetadataResolver for StubSniffer {
        fn identify(&self, _bytes: &[u8]) -> Option<ModMetadata> {
            Some(ModMetadata {
                name: Some("Sniffed".into()),
                version: Some("2.0".into()),
                loader: Some(LoaderKind::Fabric),
                game_version: Some("1.21.1".into()),
            })
        }
    }

    fn cf(project: &str, file: &str) -> ModRecord {
        ModRecord::new(
            SourceRef::CurseForge {
                project_id: project.into(),
                file_id: file.into(),
            },
            "rec",
            "1.0",
            ContentBucket::Mod,
            format!("{project}-{file}.jar"),
        )
    }

    #[test]
    fn delete_record_cascades_through_modpacks() {
        let mut mgr = PackManager::open_in_memory().unwrap();
        let rec = mgr.catalog.upsert(cf("100", "1")).unwrap();
        let pack = mgr
            .modpacks
            .create("p", "1.21.1", LoaderKind::Fabric)
            .unwrap();
        mgr.modpacks
            .add_member(&pack.id, &rec, &mgr.catalog)
            .unwrap();
        mgr.modpacks.set_enabled(&pack.id, &rec.id, false).unwrap();

        assert!(mgr.delete_record(&rec.id).unwrap());

        let def = mgr.modpacks.get(&pack.id).unwrap();
        assert!(def.member_ids.is_empty());
        assert!(def.disabled_ids.is_empty());
        assert!(!mgr.delete_record(&rec.id).unwrap());
    }

    #[test]
    fn delete_modpack_drops_its_history() {
        let mut mgr = PackManager::open_in_memory().unwrap();
        let pack = mgr
            .modpacks
            .create("p", "1.21.1", LoaderKind::Fabric)
            .unwrap();
        mgr.initialize_history(&pack.id, "init").unwrap();

        assert!(mgr.delete_modpack(&pack.id).unwrap());
        assert!(matches!(
            mgr.versions.history(&pack.id),
            Err(PackError::ModpackNotFound(_))
        ));
    }

    #[test]
    fn rollback_preserves_disabled_state_and_extends_history() {
        let mut mgr = PackManager::open_in_memory().unwrap();
        let a = mgr.catalog.upsert(cf("100", "1")).unwrap();
        let b = mgr.catalog.upsert(cf("200", "1")).unwrap();
        let pack = mgr
            .modpacks
            .create("p", "1.21.1", LoaderKind::Fabric)
            .unwrap();

        mgr.modpacks.add_member(&pack.id, &a, &mgr.catalog).unwrap();
        mgr.modpacks.add_member(&pack.id, &b, &mgr.catalog).unwrap();
        mgr.modpacks.set_enabled(&pack.id, &b.id, false).unwrap();
        mgr.commit(&pack.id, "two members, b disabled", None).unwrap();

        mgr.modpacks.remove_member(&pack.id, &b.id).unwrap();
        mgr.commit(&pack.id, "dropped b", None).unwrap();

        let restored = mgr.rollback(&pack.id, "v1", None).unwrap();

        let def = mgr.modpacks.get(&pack.id).unwrap();
        assert_eq!(def.member_ids.len(), 2);
        assert!(def.disabled_ids.contains(&b.id));
        // Forward-only: rollback appended v3 instead of rewriting.
        assert_eq!(restored.id, "v3");
        assert_eq!(mgr.versions.history(&pack.id).unwrap().snapshots.len(), 3);
    }

    #[test]
    fn rollback_intersects_with_available_ids() {
        let mut mgr = PackManager::open_in_memory().unwrap();
        let a = mgr.catalog.upsert(cf("100", "1")).unwrap();
        let b = mgr.catalog.upsert(cf("200", "1")).unwrap();
        let pack = mgr
            .modpacks
            .create("p", "1.21.1", LoaderKind::Fabric)
            .unwrap();

        mgr.modpacks.add_member(&pack.id, &a, &mgr.catalog).unwrap();
        mgr.modpacks.add_member(&pack.id, &b, &mgr.catalog).unwrap();
        mgr.commit(&pack.id, "both", None).unwrap();
        mgr.modpacks.remove_member(&pack.id, &a.id).unwrap();
        mgr.modpacks.remove_member(&pack.id, &b.id).unwrap();
        mgr.commit(&pack.id, "none", None).unwrap();

        let available: BTreeSet<String> = [a.id.clone()].into_iter().collect();
        mgr.rollback(&pack.id, "v1", Some(&available)).unwrap();

        assert_eq!(mgr.modpacks.get(&pack.id).unwrap().member_ids, vec![a.id]);
    }

    #[test]
    fn rollback_to_unknown_version_is_not_found() {
        let mut mgr = PackManager::open_in_memory().unwrap();
        let pack = mgr
            .modpacks
            .create("p", "1.21.1", LoaderKind::Fabric)
            .unwrap();
        mgr.initialize_history(&pack.id, "init").unwrap();

        assert!(matches!(
            mgr.rollback(&pack.id, "v9", None),
            Err(PackError::VersionNotFound { .. })
        ));
    }

    #[test]
    fn register_local_file_is_keyed_by_content_hash() {
        let mut mgr = PackManager::open_in_memory().unwrap();

        let first = mgr
            .register_local_file("thing.jar", b"same bytes", ContentBucket::Mod, &StubSniffer)
            .unwrap();
        let second = mgr
            .register_local_file("renamed.jar", b"same bytes", ContentBucket::Mod, &StubSniffer)
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.name, "Sniffed");
        assert_eq!(first.loader, Some(LoaderKind::Fabric));
        assert_eq!(mgr.catalog.len(), 1);
    }
}
