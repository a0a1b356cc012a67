//! # Boardmesh Sync Engine
//!
//! Serverless peer-to-peer synchronization of a shared whiteboard document.
//!
//! ## Architecture
//!
//! - **Elements**: versioned, independently addressable document units merged
//!   with a last-writer-wins rule on `(version, versionNonce)`
//! - **Reconcilers**: per-document-type adapters over an [`ElementStore`]
//!   ([`ElementSetReconciler`], [`CanvasReconciler`])
//! - **Mesh**: a gossip-style membership protocol (`hello` / `sync` / `update`)
//!   run by [`MeshCoordinator`] over channels supplied by a [`Transport`]
//! - **Node**: one tokio task per participant serializing every event
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mesh_sync::{ElementSetReconciler, FixedIdentity, MemoryTransport, MeshNode, SyncConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> mesh_sync::Result<()> {
//!     let transport = Arc::new(MemoryTransport::new());
//!     let config = SyncConfig::default();
//!
//!     let alice = MeshNode::spawn(
//!         &config,
//!         &FixedIdentity::new("alice")?,
//!         transport.clone(),
//!         ElementSetReconciler::default(),
//!     )?;
//!     let bob = MeshNode::spawn(
//!         &config,
//!         &FixedIdentity::new("bob")?,
//!         transport,
//!         ElementSetReconciler::default(),
//!     )?;
//!
//!     alice.connect_to(bob.identity().clone())?;
//!     let view = alice.current_view().await?;
//!     println!("mesh: {:?}", view.to_vec());
//!     Ok(())
//! }
//! ```

pub mod bus;
pub mod canvas;
pub mod config;
pub mod element;
pub mod element_set;
pub mod identity;
pub mod membership;
pub mod mesh;
pub mod node;
pub mod protocol;
pub mod reconciler;
pub mod store;
pub mod transport;

pub use canvas::CanvasReconciler;
pub use config::SyncConfig;
pub use element::Element;
pub use element_set::ElementSetReconciler;
pub use identity::{FileIdentity, FixedIdentity, IdentityProvider, PeerId};
pub use mesh::{MeshCoordinator, MeshView};
pub use mesh_config::MembershipPolicy;
pub use node::{MeshNode, NodeHandle};
pub use protocol::MeshMessage;
pub use reconciler::{Reconciler, Update};
pub use store::ElementStore;
pub use transport::{Channel, ChannelId, MemoryTransport, Transport};

/// Common result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur during sync operations
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid peer identity: {0:?}")]
    InvalidIdentity(String),

    #[error("Peer {0} is not reachable")]
    PeerUnavailable(PeerId),

    #[error("Identity {0} is already listening")]
    IdentityInUse(PeerId),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Node has stopped")]
    NodeStopped,

    #[error("Configuration error: {0}")]
    ConfigError(#[from] anyhow::Error),
}
