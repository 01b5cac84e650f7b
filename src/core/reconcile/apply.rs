use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::error::{PackError, PackResult};
use crate::core::reconcile::{MissingEntry, ReconciliationPlan, DISABLED_SUFFIX};
use crate::core::resolver::ContentResolver;

/// How config/override files are synchronized. Config is additive only:
/// user edits are authoritative, so it is never reported obsolete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSyncMode {
    /// Replace the target unconditionally.
    Overwrite,
    /// Write only where the target is absent.
    NewOnly,
    /// No-op.
    Skip,
}

pub struct ApplyOptions {
    /// Worker-pool bound per fetch batch.
    pub concurrency: usize,
    pub config_mode: ConfigSyncMode,
    /// Directory of config overrides to synchronize, if any.
    pub config_source: Option<PathBuf>,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            concurrency: 20,
            config_mode: ConfigSyncMode::Skip,
            config_source: None,
        }
    }
}

/// Aggregate outcome of one apply pass. Per-item failures land in `errors`
/// and never fail the call; only structural failures do.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ApplyReport {
    pub fetched: usize,
    pub skipped: usize,
    pub toggled: usize,
    pub removed: usize,
    pub configs_copied: usize,
    pub configs_skipped: usize,
    pub errors: Vec<String>,
}

fn physical_name(filename: &str, enabled: bool) -> String {
    if enabled {
        filename.to_string()
    } else {
        format!("{filename}{DISABLED_SUFFIX}")
    }
}

async fn fetch_one(
    entry: &MissingEntry,
    instance_dir: &Path,
    resolver: &dyn ContentResolver,
) -> PackResult<()> {
    let bytes = resolver.fetch(&entry.source).await?;

    let dir = instance_dir.join(entry.bucket.dir_name());
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|source| PackError::Io {
            path: dir.clone(),
            source,
        })?;

    let dest = dir.join(physical_name(&entry.filename, entry.want_enabled));
    tokio::fs::write(&dest, &bytes)
        .await
        .map_err(|source| PackError::Io {
            path: dest,
            source,
        })?;
    Ok(())
}

/// Apply a [`ReconciliationPlan`] to an instance directory.
///
/// Missing content is fetched in sequential batches of
/// `options.concurrency`; workers within a batch run in parallel and one
/// failed fetch never aborts its batch. Toggles are renames. Obsolete files
/// are deleted only when the plan was computed with `clear_existing`.
pub async fn apply(
    plan: &ReconciliationPlan,
    instance_dir: &Path,
    resolver: &dyn ContentResolver,
    options: &ApplyOptions,
) -> PackResult<ApplyReport> {
    if !instance_dir.is_dir() {
        return Err(PackError::InstanceUnresolvable(instance_dir.to_path_buf()));
    }

    let mut report = ApplyReport::default();

    // ── Fetch missing content ───────────────────────────
    let total = plan.missing.len();
    let completed = AtomicUsize::new(0);
    for batch in plan.missing.chunks(options.concurrency.max(1)) {
        let results = future::join_all(batch.iter().map(|entry| {
            let completed = &completed;
            async move {
                let outcome = fetch_one(entry, instance_dir, resolver).await;
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Fetch {}/{}: {}", done, total, entry.filename);
                (entry, outcome)
            }
        }))
        .await;

        for (entry, outcome) in results {
            match outcome {
                Ok(()) => report.fetched += 1,
                Err(e) => {
                    report.skipped += 1;
                    report.errors.push(format!("{}: {}", entry.filename, e));
                }
            }
        }
    }

    // ── Toggle via rename ───────────────────────────────
    for toggle in &plan.toggle {
        let dir = instance_dir.join(toggle.bucket.dir_name());
        let (from, to) = if toggle.want_enabled {
            (
                physical_name(&toggle.filename, false),
                physical_name(&toggle.filename, true),
            )
        } else {
            (
                physical_name(&toggle.filename, true),
                physical_name(&toggle.filename, false),
            )
        };

        match tokio::fs::rename(dir.join(&from), dir.join(&to)).await {
            Ok(()) => report.toggled += 1,
            Err(e) => report.errors.push(format!("{}: toggle failed: {}", toggle.filename, e)),
        }
    }

    // ── Remove obsolete files (destructive pass only) ───
    if plan.clear_existing {
        for obsolete in &plan.obsolete {
            let path = instance_dir
                .join(obsolete.bucket.dir_name())
                .join(physical_name(&obsolete.filename, !obsolete.disabled));
            match tokio::fs::remove_file(&path).await {
                Ok(()) => report.removed += 1,
                Err(e) => report
                    .errors
                    .push(format!("{}: remove failed: {}", obsolete.filename, e)),
            }
        }
    }

    // ── Config overrides ────────────────────────────────
    if options.config_mode != ConfigSyncMode::Skip {
        if let Some(source) = &options.config_source {
            let target = instance_dir.join("config");
            if let Err(e) = sync_config_dir(source, &target, options.config_mode, &mut report) {
                report
                    .errors
                    .push(format!("config sync from {:?} failed: {}", source, e));
            }
        }
    }

    info!(
        "Apply done: {} fetched, {} skipped, {} toggled, {} removed, {} config(s) copied",
        report.fetched, report.skipped, report.toggled, report.removed, report.configs_copied
    );
    Ok(report)
}

fn sync_config_dir(
    source: &Path,
    destination: &Path,
    mode: ConfigSyncMode,
    report: &mut ApplyReport,
) -> std::io::Result<()> {
    std::fs::create_dir_all(destination)?;

    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = destination.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            sync_config_dir(&src_path, &dst_path, mode, report)?;
        } else if file_type.is_file() {
            if mode == ConfigSyncMode::NewOnly && dst_path.exists() {
                report.configs_skipped += 1;
                continue;
            }
            std::fs::copy(&src_path, &dst_path)?;
            report.configs_copied += 1;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::core::catalog::{ContentBucket, LoaderKind, SourceRef};
    use crate::core::reconcile::ToggleEntry;
    use crate::core::resolver::FileRef;

    struct FakeResolver {
        files: HashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl ContentResolver for FakeResolver {
        async fn fetch(&self, source: &SourceRef) -> PackResult<Vec<u8>> {
            self.files
                .get(&source.key())
                .cloned()
                .ok_or_else(|| PackError::DownloadFailed {
                    url: source.key(),
                    status: 404,
                })
        }

        async fn find_compatible_file(
            &self,
            _project_key: &str,
            _game_version: &str,
            _loader: LoaderKind,
        ) -> PackResult<Option<FileRef>> {
            Ok(None)
        }
    }

    fn missing(project: &str, filename: &str, want_enabled: bool) -> MissingEntry {
        MissingEntry {
            mod_id: format!("id-{project}"),
            source: SourceRef::CurseForge {
                project_id: project.into(),
                file_id: "1".into(),
            },
            bucket: ContentBucket::Mod,
            filename: filename.into(),
            want_enabled,
        }
    }

    #[tokio::test]
    async fn fetches_disabled_members_with_marker_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FakeResolver {
            files: HashMap::from([("curseforge:1:1".to_string(), b"bytes".to_vec())]),
        };
        let plan = ReconciliationPlan {
            missing: vec![missing("1", "y.jar", false)],
            ..Default::default()
        };

        let report = apply(&plan, dir.path(), &resolver, &ApplyOptions::default())
            .await
            .unwrap();

        assert_eq!(report.fetched, 1);
        assert!(dir.path().join("mods/y.jar.disabled").exists());
        assert!(!dir.path().join("mods/y.jar").exists());
    }

    #[tokio::test]
    async fn one_failed_fetch_does_not_abort_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FakeResolver {
            files: HashMap::from([("curseforge:1:1".to_string(), b"ok".to_vec())]),
        };
        let plan = ReconciliationPlan {
            missing: vec![missing("1", "x.jar", true), missing("2", "gone.jar", true)],
            ..Default::default()
        };

        let report = apply(&plan, dir.path(), &resolver, &ApplyOptions::default())
            .await
            .unwrap();

        assert_eq!(report.fetched, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(dir.path().join("mods/x.jar").exists());
    }

    #[tokio::test]
    async fn toggle_is_a_pure_rename() {
        let dir = tempfile::tempdir().unwrap();
        let mods = dir.path().join("mods");
        std::fs::create_dir_all(&mods).unwrap();
        std::fs::write(mods.join("x.jar"), b"content").unwrap();

        let resolver = FakeResolver {
            files: HashMap::new(),
        };
        let plan = ReconciliationPlan {
            toggle: vec![ToggleEntry {
                bucket: ContentBucket::Mod,
                filename: "x.jar".into(),
                want_enabled: false,
            }],
            ..Default::default()
        };

        let report = apply(&plan, dir.path(), &resolver, &ApplyOptions::default())
            .await
            .unwrap();

        assert_eq!(report.toggled, 1);
        assert!(mods.join("x.jar.disabled").exists());
        assert_eq!(std::fs::read(mods.join("x.jar.disabled")).unwrap(), b"content");
    }

    #[tokio::test]
    async fn unresolvable_instance_dir_is_the_only_hard_failure() {
        let resolver = FakeResolver {
            files: HashMap::new(),
        };
        let plan = ReconciliationPlan::default();

        let result = apply(
            &plan,
            Path::new("/definitely/not/here"),
            &resolver,
            &ApplyOptions::default(),
        )
        .await;

        assert!(matches!(result, Err(PackError::InstanceUnresolvable(_))));
    }

    #[tokio::test]
    async fn new_only_config_sync_preserves_user_edits() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = tempfile::tempdir().unwrap();
        std::fs::write(overrides.path().join("a.toml"), b"packaged").unwrap();
        std::fs::write(overrides.path().join("b.toml"), b"packaged").unwrap();

        let config_dir = dir.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("a.toml"), b"user-edited").unwrap();

        let resolver = FakeResolver {
            files: HashMap::new(),
        };
        let options = ApplyOptions {
            config_mode: ConfigSyncMode::NewOnly,
            config_source: Some(overrides.path().to_path_buf()),
            ..Default::default()
        };

        let report = apply(&ReconciliationPlan::default(), dir.path(), &resolver, &options)
            .await
            .unwrap();

        assert_eq!(report.configs_copied, 1);
        assert_eq!(report.configs_skipped, 1);
        assert_eq!(std::fs::read(config_dir.join("a.toml")).unwrap(), b"user-edited");
        assert_eq!(std::fs::read(config_dir.join("b.toml")).unwrap(), b"packaged");
    }
}
