//! Common types and errors for Boardmesh
//!
//! This crate provides the error type and process-level constants shared by
//! the configuration layer and the `boardmesh` binary.

pub mod telemetry;

use thiserror::Error;

/// Core error types for Boardmesh workspace operations
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, MeshError>;

/// Name of the per-workspace directory holding config and identity
pub const WORKSPACE_DIR: &str = ".boardmesh";

/// Exit code constants
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
