//! `boardmesh init`

use super::workspace_root;
use anyhow::{bail, Result};
use mesh_config::Config;

/// Write a default `.boardmesh/config.toml`, refusing to overwrite one
pub async fn cmd_init() -> Result<()> {
    let root = workspace_root()?;
    let config_path = Config::path_for(&root);

    if config_path.exists() {
        bail!("{} already exists", config_path.display());
    }

    let written = Config::with_root(&root).save()?;
    tracing::info!(path = %written.display(), "workspace initialized");
    eprintln!("✓ Created {}", written.display());
    eprintln!("✓ Workspace initialized");
    Ok(())
}
