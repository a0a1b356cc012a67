//! Peer identities and how a node obtains its own

use crate::{Result, SyncError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// Opaque, session-stable address of a participant
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Validate and wrap an identity; empty or whitespace-bearing ids are rejected
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(SyncError::InvalidIdentity(id));
        }
        Ok(Self(id))
    }

    /// A new random identity (32 hex digits)
    pub fn generate() -> Self {
        Self(format!("{:032x}", rand::thread_rng().gen::<u128>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PeerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Supplies the identity a node runs under
pub trait IdentityProvider {
    fn provide(&self) -> Result<PeerId>;
}

/// Identity fixed by configuration
#[derive(Debug, Clone)]
pub struct FixedIdentity(PeerId);

impl FixedIdentity {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        Ok(Self(PeerId::parse(id)?))
    }
}

impl IdentityProvider for FixedIdentity {
    fn provide(&self) -> Result<PeerId> {
        Ok(self.0.clone())
    }
}

/// Identity persisted in a file, generated on first use
#[derive(Debug, Clone)]
pub struct FileIdentity {
    path: PathBuf,
}

impl FileIdentity {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IdentityProvider for FileIdentity {
    fn provide(&self) -> Result<PeerId> {
        if self.path.exists() {
            let stored = fs::read_to_string(&self.path)?;
            return PeerId::parse(stored.trim());
        }

        let id = PeerId::generate();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, format!("{}\n", id))?;
        tracing::info!(identity = %id, path = ?self.path, "provisioned new identity");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_test_helpers::workspace::temp_dir;

    #[test]
    fn test_parse_rejects_blank_and_spaces() {
        assert!(PeerId::parse("").is_err());
        assert!(PeerId::parse("two words").is_err());
        assert_eq!(PeerId::parse("alice").unwrap().as_str(), "alice");
    }

    #[test]
    fn test_generated_ids_differ() {
        let a = PeerId::generate();
        let b = PeerId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_file_identity_is_stable() {
        let temp = temp_dir();
        let provider = FileIdentity::new(temp.path().join(".boardmesh/identity"));

        let first = provider.provide().unwrap();
        let second = provider.provide().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_file_identity_reads_existing() {
        let temp = temp_dir();
        let path = temp.path().join("identity");
        fs::write(&path, "carol\n").unwrap();

        let id = FileIdentity::new(path).provide().unwrap();
        assert_eq!(id.as_str(), "carol");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = PeerId::parse("dave").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"dave\"");
    }
}
