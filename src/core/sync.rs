use tracing::info;

use crate::core::error::{PackError, PackResult};
use crate::core::http::build_http_client;
use crate::core::import::{ImportOutcome, PackManifest};
use crate::core::manager::PackManager;
use crate::core::resolver::ContentResolver;

/// Pull a modpack's remote manifest and run it through the import flow.
///
/// Conflicts surface exactly as with a local import; `last_checked` is
/// stamped once the scan completed (whether or not it halted on conflicts).
pub async fn pull(
    manager: &mut PackManager,
    resolver: &dyn ContentResolver,
    modpack_id: &str,
) -> PackResult<ImportOutcome> {
    let client = build_http_client()?;
    let url = {
        let def = manager.modpacks.get(modpack_id)?;
        def.remote
            .as_ref()
            .map(|r| r.url.clone())
            .ok_or_else(|| {
                PackError::Other(format!("modpack {modpack_id} has no remote source"))
            })?
    };

    info!("Pulling manifest for modpack {} from {}", modpack_id, url);
    let response = client.get(&url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(PackError::DownloadFailed {
            url,
            status: status.as_u16(),
        });
    }

    let manifest = response.json::<PackManifest>().await?;
    let outcome = manager.begin_import(resolver, modpack_id, manifest).await?;
    manager.modpacks.mark_remote_checked(modpack_id)?;

    Ok(outcome)
}
