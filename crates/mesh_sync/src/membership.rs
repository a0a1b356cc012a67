//! Version-stamped membership bookkeeping
//!
//! Every `sync`/`update` a node sends carries a fresh epoch from its own
//! counter. A receiver remembers, per sender, the last epoch it applied and
//! which peers that sender listed and when. A peer is pruned on a sender's
//! word only if the sender listed it before, the local channel to it is older
//! than that listing, and the sender's newer list omits it. Stale or
//! reordered lists therefore never tear down a channel the sender simply had
//! not heard about yet.

use crate::identity::PeerId;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
struct SenderRecord {
    last_epoch: Option<u64>,
    /// Peer -> local tick at which this sender last listed it
    listed_at: HashMap<PeerId, u64>,
}

/// Local clock plus what each sender has claimed about the room
#[derive(Debug, Default)]
pub struct MembershipTracker {
    tick: u64,
    epoch: u64,
    senders: HashMap<PeerId, SenderRecord>,
}

impl MembershipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the local clock; used to date channels
    pub fn tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Epoch for the next outgoing membership list
    pub fn next_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Process a peer list from `sender`.
    ///
    /// Returns `None` when the list is stale (epoch not newer than the last
    /// applied one), otherwise the peers whose channels should be pruned.
    /// `channel_opened_at` reports the tick at which the local channel to a
    /// peer was opened, if there is one.
    pub fn observe<F>(
        &mut self,
        sender: &PeerId,
        listed: &BTreeSet<PeerId>,
        epoch: Option<u64>,
        channel_opened_at: F,
    ) -> Option<Vec<PeerId>>
    where
        F: Fn(&PeerId) -> Option<u64>,
    {
        let now = self.tick();
        let record = self.senders.entry(sender.clone()).or_default();

        if let Some(epoch) = epoch {
            if record.last_epoch.is_some_and(|last| epoch <= last) {
                return None;
            }
            record.last_epoch = Some(epoch);
        }

        let prune: Vec<PeerId> = record
            .listed_at
            .iter()
            .filter(|(peer, _)| *peer != sender && !listed.contains(*peer))
            .filter(|(peer, at)| channel_opened_at(*peer).is_some_and(|opened| opened < **at))
            .map(|(peer, _)| peer.clone())
            .collect();

        record.listed_at.retain(|peer, _| listed.contains(peer));
        for peer in listed {
            record.listed_at.insert(peer.clone(), now);
        }

        Some(prune)
    }

    /// Drop everything known about `sender`, e.g. once no channel to it is left
    pub fn forget(&mut self, sender: &PeerId) {
        self.senders.remove(sender);
    }

    pub fn reset(&mut self) {
        self.senders.clear();
    }
}
