//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::debug;

/// Ensure the directory holding `file` exists, creating it if needed.
pub async fn ensure_parent_dir(file: &Path) -> anyhow::Result<()> {
    let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if tokio::fs::metadata(parent).await.is_ok() {
        return Ok(());
    }
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
    debug!(dir = %parent.display(), "created data directory");
    Ok(())
}
