//! `boardmesh identity`

use super::workspace_root;
use anyhow::Result;
use mesh_config::Config;
use mesh_sync::SyncConfig;

pub async fn cmd_identity() -> Result<()> {
    let root = workspace_root()?;
    let config = Config::load(&root)?;
    let sync = SyncConfig::from_workspace(&config);
    sync.validate()?;

    let identity = sync.identity_provider()?.provide()?;
    println!("{}", identity);
    Ok(())
}
