//! CLI command builders for tests

use assert_cmd::Command;

/// Get a Command for the `boardmesh` binary with a clean environment
///
/// `RUST_LOG=error` keeps info logs out of assertions on stderr.
#[allow(deprecated)]
pub fn boardmesh_command() -> Command {
    let mut cmd = Command::cargo_bin("boardmesh").expect("Failed to find boardmesh binary");
    cmd.env("RUST_LOG", "error");
    cmd.env_remove("BOARDMESH_WORKSPACE");
    cmd
}
