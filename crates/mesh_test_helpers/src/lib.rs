//! Shared test utilities for Boardmesh test suites
//!
//! # Modules
//!
//! - [`workspace`]: temporary workspaces with a `.boardmesh` directory
//! - [`cli`]: `boardmesh` command builder with a clean environment
//! - [`logging`]: test logging configuration
//! - [`wait`]: polling helpers for asynchronous mesh convergence
//! - [`assertions`]: predicates over command output
//!
//! # Example
//!
//! ```rust,no_run
//! use mesh_test_helpers::prelude::*;
//!
//! let workspace = init_workspace();
//! boardmesh_command()
//!     .current_dir(workspace.path())
//!     .arg("identity")
//!     .assert()
//!     .success();
//! ```

pub mod assertions;
pub mod cli;
pub mod logging;
pub mod wait;
pub mod workspace;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::assertions::*;
    pub use crate::cli::boardmesh_command;
    pub use crate::logging::init_test_logging;
    pub use crate::wait::{eventually, DEFAULT_TIMEOUT};
    pub use crate::workspace::{init_workspace, temp_dir, workspace_with_config};
}
