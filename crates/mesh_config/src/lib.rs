//! Configuration management for Boardmesh
//!
//! This crate handles loading and writing `.boardmesh/config.toml`.

use mesh_common::{MeshError, Result, WORKSPACE_DIR};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace root path (set programmatically, not in TOML)
    #[serde(skip)]
    pub root: PathBuf,

    /// Node identity settings
    #[serde(default)]
    pub node: NodeConfig,

    /// Mesh membership settings
    #[serde(default)]
    pub mesh: MeshConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Node configuration ([node])
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Fixed identity; when unset the identity file is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,

    /// Identity file, relative to the workspace root
    #[serde(default = "default_identity_file")]
    pub identity_file: PathBuf,
}

fn default_identity_file() -> PathBuf {
    PathBuf::from(WORKSPACE_DIR).join("identity")
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            identity: None,
            identity_file: default_identity_file(),
        }
    }
}

/// How a node reconciles the peer lists it receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipPolicy {
    /// Peer lists carry the sender's epoch; stale lists never prune
    #[default]
    Stamped,

    /// The most recently received peer list always wins
    Eager,
}

impl fmt::Display for MembershipPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MembershipPolicy::Stamped => f.write_str("stamped"),
            MembershipPolicy::Eager => f.write_str("eager"),
        }
    }
}

impl std::str::FromStr for MembershipPolicy {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stamped" => Ok(MembershipPolicy::Stamped),
            "eager" => Ok(MembershipPolicy::Eager),
            other => Err(MeshError::ValidationError(format!(
                "unknown membership policy '{}' (expected 'stamped' or 'eager')",
                other
            ))),
        }
    }
}

/// Mesh configuration ([mesh])
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MeshConfig {
    #[serde(default)]
    pub membership: MembershipPolicy,
}

/// Logging configuration ([logging])
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub json: bool,
}

impl Config {
    /// Default configuration rooted at `workspace_root`
    pub fn with_root(workspace_root: &Path) -> Self {
        Self {
            root: workspace_root.to_path_buf(),
            node: NodeConfig::default(),
            mesh: MeshConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Path of the config file for a workspace root
    pub fn path_for(workspace_root: &Path) -> PathBuf {
        workspace_root.join(WORKSPACE_DIR).join("config.toml")
    }

    /// Load configuration from workspace root
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let config_path = Self::path_for(workspace_root);

        if !config_path.exists() {
            return Ok(Self::with_root(workspace_root));
        }

        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| MeshError::ConfigError(format!("Failed to read config: {}", e)))?;

        let mut config: Config = toml::from_str(&content)
            .map_err(|e| MeshError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.root = workspace_root.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Write this configuration to `<root>/.boardmesh/config.toml`
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::path_for(&self.root);
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| MeshError::ConfigError(format!("Failed to encode config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    /// Absolute location of the identity file
    pub fn identity_path(&self) -> PathBuf {
        if self.node.identity_file.is_absolute() {
            self.node.identity_file.clone()
        } else {
            self.root.join(&self.node.identity_file)
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(identity) = &self.node.identity {
            if identity.trim().is_empty() {
                return Err(MeshError::ValidationError(
                    "node.identity cannot be empty".to_string(),
                ));
            }
        }
        if self.node.identity_file.as_os_str().is_empty() {
            return Err(MeshError::ValidationError(
                "node.identity_file cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
