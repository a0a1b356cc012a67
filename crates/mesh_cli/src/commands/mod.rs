//! Subcommand implementations

pub mod identity;
pub mod init;
pub mod simulate;

use std::path::PathBuf;

/// Overrides the workspace root, which defaults to the current directory
pub const WORKSPACE_ENV: &str = "BOARDMESH_WORKSPACE";

pub fn workspace_root() -> anyhow::Result<PathBuf> {
    match std::env::var_os(WORKSPACE_ENV) {
        Some(root) if !root.is_empty() => Ok(PathBuf::from(root)),
        _ => Ok(std::env::current_dir()?),
    }
}
