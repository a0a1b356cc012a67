//! Configuration for mesh nodes

use crate::identity::{FileIdentity, FixedIdentity, IdentityProvider, PeerId};
use mesh_config::{Config, MembershipPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a mesh node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Fixed identity; takes precedence over `identity_file`
    pub identity: Option<String>,

    /// File holding the persisted identity
    pub identity_file: PathBuf,

    /// How received peer lists are reconciled
    pub membership: MembershipPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            identity: None,
            identity_file: PathBuf::from(".boardmesh/identity"),
            membership: MembershipPolicy::Stamped,
        }
    }
}

impl SyncConfig {
    /// Load config from TOML file
    pub fn from_toml(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Node settings of a loaded workspace configuration
    pub fn from_workspace(config: &Config) -> Self {
        Self {
            identity: config.node.identity.clone(),
            identity_file: config.identity_path(),
            membership: config.mesh.membership,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(identity) = &self.identity {
            if PeerId::parse(identity.as_str()).is_err() {
                anyhow::bail!("identity must be non-empty and contain no whitespace");
            }
        }
        if self.identity.is_none() && self.identity_file.as_os_str().is_empty() {
            anyhow::bail!("identity_file cannot be empty when no identity is set");
        }
        Ok(())
    }

    /// Where this node's identity comes from
    pub fn identity_provider(&self) -> crate::Result<Box<dyn IdentityProvider>> {
        Ok(match &self.identity {
            Some(id) => Box::new(FixedIdentity::new(id.as_str())?),
            None => Box::new(FileIdentity::new(self.identity_file.clone())),
        })
    }
}
