//! Import flow through the PackManager facade, including filename
//! resolution via the content resolver and the import-then-reconcile
//! journey.

mod common;

use common::FakeResolver;
use packvault::core::catalog::{ContentBucket, LoaderKind, SourceRef};
use packvault::core::import::{ImportOutcome, ManifestEntry, PackManifest, Resolution};
use packvault::core::reconcile::{self, ApplyOptions, InstanceState};
use packvault::core::resolver::FileRef;
use packvault::PackManager;

fn entry(project: &str, version: &str, name: &str, filename: Option<&str>) -> ManifestEntry {
    ManifestEntry {
        source: SourceRef::Modrinth {
            project_id: project.into(),
            version_id: version.into(),
        },
        name: name.into(),
        version: version.into(),
        filename: filename.map(str::to_string),
        bucket: ContentBucket::Mod,
    }
}

fn manifest(entries: Vec<ManifestEntry>) -> PackManifest {
    PackManifest {
        name: "upstream pack".into(),
        game_version: Some("1.21.1".into()),
        loader: Some(LoaderKind::Fabric),
        entries,
    }
}

fn target(mgr: &mut PackManager) -> String {
    mgr.modpacks
        .create("target", "1.21.1", LoaderKind::Fabric)
        .unwrap()
        .id
}

#[tokio::test]
async fn missing_filename_is_resolved_through_the_content_resolver() {
    let mut mgr = PackManager::open_in_memory().unwrap();
    let pack_id = target(&mut mgr);
    let resolver = FakeResolver::new().locating(
        "modrinth:sodium",
        FileRef {
            source: SourceRef::Modrinth {
                project_id: "sodium".into(),
                version_id: "v5".into(),
            },
            filename: "sodium-0.6.jar".into(),
        },
    );

    let outcome = mgr
        .begin_import(
            &resolver,
            &pack_id,
            manifest(vec![entry("sodium", "v5", "Sodium", None)]),
        )
        .await
        .unwrap();

    let ImportOutcome::Completed(result) = outcome else {
        panic!("expected clean import");
    };
    assert_eq!(result.added, 1);
    let record = mgr.catalog.get(&result.member_ids[0]).unwrap();
    assert_eq!(record.filename, "sodium-0.6.jar");
}

#[tokio::test]
async fn reimporting_the_same_manifest_changes_nothing() {
    let mut mgr = PackManager::open_in_memory().unwrap();
    let pack_id = target(&mut mgr);
    let resolver = FakeResolver::new();
    let m = manifest(vec![entry("50", "v1", "alpha", Some("alpha.jar"))]);

    let first = mgr.begin_import(&resolver, &pack_id, m.clone()).await.unwrap();
    let second = mgr.begin_import(&resolver, &pack_id, m).await.unwrap();

    let (ImportOutcome::Completed(first), ImportOutcome::Completed(second)) = (first, second)
    else {
        panic!("expected clean imports");
    };
    assert_eq!(first.added, 1);
    assert_eq!(second.added, 0);
    assert_eq!(second.reused, 1);
    // The second import was a no-op commit: same head snapshot.
    assert_eq!(first.snapshot.id, second.snapshot.id);
    assert_eq!(mgr.modpacks.get(&pack_id).unwrap().member_ids.len(), 1);
}

#[tokio::test]
async fn conflicted_import_resolves_and_then_reconciles() {
    let mut mgr = PackManager::open_in_memory().unwrap();
    let pack_id = target(&mut mgr);
    let resolver = FakeResolver::new()
        .serving("modrinth:50:v2", b"new version bytes")
        .serving("modrinth:60:v1", b"other bytes");

    // Seed the library with the old version, already a member.
    let seeded = mgr
        .begin_import(
            &resolver,
            &pack_id,
            manifest(vec![entry("50", "v1", "alpha", Some("alpha-v1.jar"))]),
        )
        .await
        .unwrap();
    let ImportOutcome::Completed(_) = seeded else {
        panic!("seed import should be clean");
    };

    // Incoming pack references a different file of project 50.
    let outcome = mgr
        .begin_import(
            &resolver,
            &pack_id,
            manifest(vec![
                entry("50", "v2", "alpha", Some("alpha-v2.jar")),
                entry("60", "v1", "beta", Some("beta.jar")),
            ]),
        )
        .await
        .unwrap();
    let ImportOutcome::Conflicted { token_id, conflicts } = outcome else {
        panic!("expected a version conflict");
    };
    assert_eq!(conflicts.len(), 1);

    let result = mgr
        .resolve_import(&resolver, &token_id, &[Resolution::UseNew])
        .await
        .unwrap();
    assert_eq!(result.added, 2);

    // The membership holds the new version plus beta; reconcile materializes
    // both.
    let def = mgr.modpacks.get(&pack_id).unwrap();
    assert_eq!(def.member_ids.len(), 2);

    let instance = tempfile::tempdir().unwrap();
    let state = InstanceState::probe(instance.path()).await.unwrap();
    let plan = mgr.plan(&pack_id, &state, false).unwrap();
    let report = reconcile::apply(&plan, instance.path(), &resolver, &ApplyOptions::default())
        .await
        .unwrap();

    assert_eq!(report.fetched, 2);
    assert!(instance.path().join("mods/alpha-v2.jar").exists());
    assert!(instance.path().join("mods/beta.jar").exists());
    assert!(!instance.path().join("mods/alpha-v1.jar").exists());
}

#[tokio::test]
async fn import_into_unknown_modpack_is_not_found() {
    let mut mgr = PackManager::open_in_memory().unwrap();
    let resolver = FakeResolver::new();

    let err = mgr
        .begin_import(&resolver, "ghost", manifest(vec![]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        packvault::PackError::ModpackNotFound(_)
    ));
}
