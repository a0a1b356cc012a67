//! Channel establishment seam and an in-process implementation
//!
//! How bytes actually travel between participants is outside the mesh
//! protocol. A [`Transport`] hands the coordinator ordered, bidirectional
//! [`Channel`]s; dropping a channel's outbound half closes it for the remote
//! side.

use crate::identity::PeerId;
use crate::{Result, SyncError};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Locally unique channel handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// One end of an open point-to-point link
#[derive(Debug)]
pub struct Channel {
    id: ChannelId,
    remote: PeerId,
    initiator: PeerId,
    outbound: UnboundedSender<Vec<u8>>,
    inbound: UnboundedReceiver<Vec<u8>>,
}

impl Channel {
    pub fn new(
        id: ChannelId,
        remote: PeerId,
        initiator: PeerId,
        outbound: UnboundedSender<Vec<u8>>,
        inbound: UnboundedReceiver<Vec<u8>>,
    ) -> Self {
        Self {
            id,
            remote,
            initiator,
            outbound,
            inbound,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn remote(&self) -> &PeerId {
        &self.remote
    }

    /// Identity of the side that opened the channel
    pub fn initiator(&self) -> &PeerId {
        &self.initiator
    }

    /// Split into the sending half and the receiving half
    pub fn into_parts(self) -> (UnboundedSender<Vec<u8>>, UnboundedReceiver<Vec<u8>>) {
        (self.outbound, self.inbound)
    }
}

/// Establishes channels between identities
pub trait Transport: Send + Sync + 'static {
    /// Start accepting channels addressed to `identity`
    fn listen(&self, identity: &PeerId) -> Result<UnboundedReceiver<Channel>>;

    /// Open a channel from `local` to `remote`
    fn connect(&self, local: &PeerId, remote: &PeerId) -> Result<Channel>;
}

/// Transport connecting nodes that live in the same process
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    listeners: Arc<Mutex<HashMap<PeerId, UnboundedSender<Channel>>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<PeerId, UnboundedSender<Channel>>>> {
        self.listeners
            .lock()
            .map_err(|_| SyncError::TransportError("listener table poisoned".to_string()))
    }
}

impl Transport for MemoryTransport {
    fn listen(&self, identity: &PeerId) -> Result<UnboundedReceiver<Channel>> {
        let mut listeners = self.lock()?;
        if let Some(existing) = listeners.get(identity) {
            if !existing.is_closed() {
                return Err(SyncError::IdentityInUse(identity.clone()));
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        listeners.insert(identity.clone(), tx);
        Ok(rx)
    }

    fn connect(&self, local: &PeerId, remote: &PeerId) -> Result<Channel> {
        let listeners = self.lock()?;
        let listener = listeners
            .get(remote)
            .ok_or_else(|| SyncError::PeerUnavailable(remote.clone()))?;

        let id = ChannelId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (to_remote, remote_inbound) = mpsc::unbounded_channel();
        let (to_local, local_inbound) = mpsc::unbounded_channel();

        let accepted = Channel::new(id, local.clone(), local.clone(), to_local, remote_inbound);
        listener
            .send(accepted)
            .map_err(|_| SyncError::PeerUnavailable(remote.clone()))?;

        Ok(Channel::new(id, remote.clone(), local.clone(), to_remote, local_inbound))
    }
}
