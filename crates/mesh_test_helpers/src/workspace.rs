//! Workspace initialization utilities for tests

use assert_fs::TempDir;
use std::fs;

/// Create a temporary directory, removed when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Create a temp workspace containing an empty `.boardmesh` directory
///
/// ```rust
/// use mesh_test_helpers::workspace::init_workspace;
///
/// let workspace = init_workspace();
/// assert!(workspace.path().join(".boardmesh").exists());
/// ```
pub fn init_workspace() -> TempDir {
    let temp = temp_dir();
    fs::create_dir_all(temp.path().join(".boardmesh"))
        .expect("Failed to create .boardmesh directory");
    temp
}

/// Create a workspace whose `.boardmesh/config.toml` holds `config`
pub fn workspace_with_config(config: &str) -> TempDir {
    let workspace = init_workspace();
    fs::write(workspace.path().join(".boardmesh/config.toml"), config)
        .expect("Failed to write config.toml");
    workspace
}
