//! Mesh coordinator: channel ownership and the membership protocol

use crate::bus::Subscribers;
use crate::identity::PeerId;
use crate::membership::MembershipTracker;
use crate::protocol::MeshMessage;
use crate::reconciler::{Reconciler, Update};
use crate::transport::{Channel, ChannelId, Transport};
use mesh_config::MembershipPolicy;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// A node's local belief of who is in the room: itself plus every peer it
/// holds an open channel to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MeshView {
    peers: BTreeSet<PeerId>,
}

impl MeshView {
    pub fn contains(&self, peer: &PeerId) -> bool {
        self.peers.contains(peer)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerId> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn to_vec(&self) -> Vec<PeerId> {
        self.peers.iter().cloned().collect()
    }
}

/// Activity observed on a registered channel
#[derive(Debug)]
pub enum ChannelInput {
    Frame { channel: ChannelId, bytes: Vec<u8> },
    Closed(ChannelId),
}

struct Link {
    remote: PeerId,
    initiator: PeerId,
    outbound: UnboundedSender<Vec<u8>>,
    reader: JoinHandle<()>,
    opened_at: u64,
    /// We sent `hello` on this channel
    introduced: bool,
    /// Last view we sent on this channel
    announced: Option<MeshView>,
}

impl Drop for Link {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Owns one identity's channels, runs the `hello`/`sync`/`update` protocol and
/// hands every payload to its [`Reconciler`].
///
/// All methods must be called from a single task (see [`crate::MeshNode`]);
/// inbound frames are delivered back through the `inbox` given to
/// [`MeshCoordinator::new`].
pub struct MeshCoordinator<R: Reconciler> {
    identity: PeerId,
    policy: MembershipPolicy,
    transport: Arc<dyn Transport>,
    reconciler: R,
    created: UnboundedReceiver<Update>,
    links: BTreeMap<ChannelId, Link>,
    membership: MembershipTracker,
    subscribers: Subscribers<MeshView>,
    inbox: UnboundedSender<ChannelInput>,
}

impl<R: Reconciler> MeshCoordinator<R> {
    pub fn new(
        identity: PeerId,
        policy: MembershipPolicy,
        transport: Arc<dyn Transport>,
        mut reconciler: R,
        inbox: UnboundedSender<ChannelInput>,
    ) -> Self {
        let created = reconciler.subscribe_created_updates();
        Self {
            identity,
            policy,
            transport,
            reconciler,
            created,
            links: BTreeMap::new(),
            membership: MembershipTracker::new(),
            subscribers: Subscribers::new(),
            inbox,
        }
    }

    pub fn identity(&self) -> &PeerId {
        &self.identity
    }

    pub fn reconciler(&self) -> &R {
        &self.reconciler
    }

    /// Mutable access for document-specific operations. Follow up with
    /// [`MeshCoordinator::flush_created_updates`] so resulting deltas go out.
    pub fn reconciler_mut(&mut self) -> &mut R {
        &mut self.reconciler
    }

    pub fn current_view(&self) -> MeshView {
        let mut peers: BTreeSet<PeerId> = self.links.values().map(|l| l.remote.clone()).collect();
        peers.insert(self.identity.clone());
        MeshView { peers }
    }

    pub fn channel_count(&self) -> usize {
        self.links.len()
    }

    /// Receive the view after every change to the channel set
    pub fn subscribe(&mut self) -> UnboundedReceiver<MeshView> {
        self.subscribers.subscribe()
    }

    /// Open a channel to `peer` and introduce ourselves on it.
    ///
    /// Connecting to ourselves or to a peer already in the view does nothing.
    /// Returns whether a channel was opened.
    pub fn connect_to(&mut self, peer: &PeerId) -> bool {
        if *peer == self.identity {
            tracing::debug!("ignoring connect to own identity");
            return false;
        }
        if self.link_to(peer).is_some() {
            tracing::debug!(peer = %peer, "already connected");
            return false;
        }
        self.open(peer, true)
    }

    /// Register a channel another peer opened to us
    pub fn accept(&mut self, channel: Channel) {
        self.register(channel, false);
    }

    /// Close every channel. Peers are not told; they notice the closed channels.
    pub fn disconnect(&mut self) {
        let closed = self.links.len();
        self.links.clear();
        self.membership.reset();
        tracing::info!(closed, "disconnected from mesh");
        if closed > 0 {
            self.notify_view();
        }
    }

    pub fn handle_input(&mut self, input: ChannelInput) {
        match input {
            ChannelInput::Frame { channel, bytes } => self.handle_frame(channel, &bytes),
            ChannelInput::Closed(channel) => self.channel_closed(channel),
        }
    }

    /// Decode and dispatch one frame; malformed frames are logged and dropped
    pub fn handle_frame(&mut self, channel: ChannelId, bytes: &[u8]) {
        if !self.links.contains_key(&channel) {
            tracing::debug!(%channel, "dropping frame from unregistered channel");
            return;
        }

        match MeshMessage::from_bytes(bytes) {
            Ok(message) => self.handle_command(channel, message),
            Err(e) => tracing::warn!(%channel, error = %e, "dropping malformed message"),
        }
    }

    pub fn handle_command(&mut self, from: ChannelId, message: MeshMessage) {
        tracing::debug!(channel = %from, kind = message.kind(), "received message");

        match message {
            MeshMessage::Hello { my_identity } => {
                if let Some(link) = self.links.get(&from) {
                    if link.remote != my_identity {
                        tracing::warn!(
                            channel = %from,
                            claimed = %my_identity,
                            remote = %link.remote,
                            "hello identity does not match channel"
                        );
                    }
                }
                self.broadcast_sync();
            }

            MeshMessage::Sync {
                peers_in_room,
                data,
                epoch,
            } => {
                self.reconcile_membership(from, &peers_in_room, epoch);
                if let Some(data) = data {
                    self.reconciler.apply_update(data);
                }
            }

            MeshMessage::Update {
                peers_in_room,
                update,
                epoch,
            } => {
                self.reconcile_membership(from, &peers_in_room, epoch);
                self.reconciler.apply_update(update);
            }
        }
    }

    /// Record a local edit and broadcast the resulting delta
    pub fn create_update(&mut self, new_full_state: Update) -> Option<Update> {
        let delta = self.reconciler.create_update(new_full_state);
        self.flush_created_updates();
        delta
    }

    /// Broadcast every delta the reconciler has published since the last flush
    pub fn flush_created_updates(&mut self) {
        while let Ok(update) = self.created.try_recv() {
            let view = self.current_view();
            let message = MeshMessage::Update {
                peers_in_room: view.to_vec(),
                update,
                epoch: self.stamp(),
            };
            self.broadcast(&message);
            self.mark_announced(&view);
        }
    }

    fn reconcile_membership(&mut self, from: ChannelId, peers_in_room: &[PeerId], epoch: Option<u64>) {
        let Some(sender) = self.links.get(&from).map(|l| l.remote.clone()) else {
            return;
        };
        let listed: BTreeSet<PeerId> = peers_in_room.iter().cloned().collect();

        match self.policy {
            MembershipPolicy::Eager => {
                for peer in &listed {
                    if !self.current_view().contains(peer) {
                        self.open(peer, false);
                    }
                }
                for peer in self.current_view().to_vec() {
                    if !listed.contains(&peer) {
                        self.prune(&peer);
                    }
                }
            }

            MembershipPolicy::Stamped => {
                let links = &self.links;
                let verdict = self.membership.observe(&sender, &listed, epoch, |peer| {
                    links
                        .values()
                        .filter(|l| l.remote == *peer)
                        .map(|l| l.opened_at)
                        .min()
                });
                let Some(prune) = verdict else {
                    tracing::debug!(sender = %sender, ?epoch, "ignoring stale peer list");
                    return;
                };

                for peer in &prune {
                    self.prune(peer);
                }
                for peer in &listed {
                    if *peer != self.identity && self.link_to(peer).is_none() {
                        self.open(peer, false);
                    }
                }

                // Each view is re-announced at most once per channel.
                let view = self.current_view();
                let missing = view.iter().any(|peer| !listed.contains(peer));
                let already_sent = self
                    .links
                    .get(&from)
                    .is_some_and(|link| link.announced.as_ref() == Some(&view));
                if missing && already_sent {
                    tracing::debug!(sender = %sender, "sender already has our view");
                } else if missing {
                    tracing::debug!(sender = %sender, "sender is missing peers, re-announcing");
                    self.broadcast_sync();
                }
            }
        }
    }

    fn broadcast_sync(&mut self) {
        let view = self.current_view();
        let message = MeshMessage::Sync {
            peers_in_room: view.to_vec(),
            data: Some(self.reconciler.create_full_state_update()),
            epoch: self.stamp(),
        };
        self.broadcast(&message);
        self.mark_announced(&view);
    }

    fn mark_announced(&mut self, view: &MeshView) {
        for link in self.links.values_mut() {
            link.announced = Some(view.clone());
        }
    }

    fn stamp(&mut self) -> Option<u64> {
        match self.policy {
            MembershipPolicy::Stamped => Some(self.membership.next_epoch()),
            MembershipPolicy::Eager => None,
        }
    }

    fn open(&mut self, peer: &PeerId, introduce: bool) -> bool {
        match self.transport.connect(&self.identity, peer) {
            Ok(channel) => {
                self.register(channel, introduce);
                true
            }
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "failed to open channel");
                false
            }
        }
    }

    fn register(&mut self, channel: Channel, introduce: bool) {
        let id = channel.id();
        let remote = channel.remote().clone();
        let initiator = channel.initiator().clone();

        if remote == self.identity {
            tracing::warn!(channel = %id, "refusing channel to own identity");
            return;
        }

        // Both ends keep the channel opened by the smaller identity.
        let mut hello_lost = false;
        if let Some(existing) = self.link_to(&remote) {
            let preferred = std::cmp::min(&self.identity, &remote).clone();
            let existing_initiator = self.links[&existing].initiator.clone();
            if existing_initiator == preferred || initiator != preferred {
                tracing::debug!(peer = %remote, channel = %id, "dropping duplicate channel");
                return;
            }
            if let Some(old) = self.remove_link(existing) {
                tracing::debug!(peer = %remote, channel = %existing, "replacing duplicate channel");
                hello_lost = old.introduced;
            }
        }

        let (outbound, inbound) = channel.into_parts();
        let reader = spawn_reader(id, inbound, self.inbox.clone());
        let opened_at = self.membership.tick();
        self.links.insert(
            id,
            Link {
                remote: remote.clone(),
                initiator,
                outbound,
                reader,
                opened_at,
                introduced: introduce || hello_lost,
                announced: None,
            },
        );
        tracing::info!(peer = %remote, channel = %id, "channel registered");

        if introduce || hello_lost {
            let hello = MeshMessage::Hello {
                my_identity: self.identity.clone(),
            };
            self.send_to(id, &hello);
        }
        self.notify_view();
    }

    fn channel_closed(&mut self, channel: ChannelId) {
        match self.remove_link(channel) {
            Some(link) => {
                tracing::info!(peer = %link.remote, %channel, "channel closed by remote");
                self.notify_view();
            }
            None => tracing::debug!(%channel, "close for unknown channel ignored"),
        }
    }

    fn prune(&mut self, peer: &PeerId) {
        let channels: Vec<ChannelId> = self
            .links
            .iter()
            .filter(|(_, l)| l.remote == *peer)
            .map(|(id, _)| *id)
            .collect();
        if channels.is_empty() {
            return;
        }

        for id in channels {
            self.remove_link(id);
        }
        tracing::info!(peer = %peer, "pruned peer from mesh");
        self.notify_view();
    }

    fn broadcast(&mut self, message: &MeshMessage) {
        let bytes = match message.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(kind = message.kind(), error = %e, "failed to encode message");
                return;
            }
        };

        let failed: Vec<ChannelId> = self
            .links
            .iter()
            .filter(|(_, link)| link.outbound.send(bytes.clone()).is_err())
            .map(|(id, _)| *id)
            .collect();
        tracing::debug!(
            kind = message.kind(),
            channels = self.links.len() - failed.len(),
            "broadcast message"
        );
        self.drop_failed(failed);
    }

    fn send_to(&mut self, channel: ChannelId, message: &MeshMessage) {
        let sent = match (self.links.get(&channel), message.to_bytes()) {
            (Some(link), Ok(bytes)) => link.outbound.send(bytes).is_ok(),
            (None, _) => return,
            (_, Err(e)) => {
                tracing::warn!(kind = message.kind(), error = %e, "failed to encode message");
                return;
            }
        };
        if !sent {
            self.drop_failed(vec![channel]);
        }
    }

    fn drop_failed(&mut self, failed: Vec<ChannelId>) {
        if failed.is_empty() {
            return;
        }
        for id in failed {
            if let Some(link) = self.remove_link(id) {
                tracing::warn!(peer = %link.remote, channel = %id, "send failed, dropping channel");
            }
        }
        self.notify_view();
    }

    fn link_to(&self, peer: &PeerId) -> Option<ChannelId> {
        self.links
            .iter()
            .find(|(_, l)| l.remote == *peer)
            .map(|(id, _)| *id)
    }

    fn remove_link(&mut self, channel: ChannelId) -> Option<Link> {
        let link = self.links.remove(&channel)?;
        if self.link_to(&link.remote).is_none() {
            self.membership.forget(&link.remote);
        }
        Some(link)
    }

    fn notify_view(&mut self) {
        let view = self.current_view();
        self.subscribers.publish(&view);
    }
}

fn spawn_reader(
    channel: ChannelId,
    mut inbound: UnboundedReceiver<Vec<u8>>,
    inbox: UnboundedSender<ChannelInput>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(bytes) = inbound.recv().await {
            if inbox.send(ChannelInput::Frame { channel, bytes }).is_err() {
                return;
            }
        }
        let _ = inbox.send(ChannelInput::Closed(channel));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::element_set::ElementSetReconciler;
    use crate::transport::MemoryTransport;
    use tokio::sync::mpsc;

    fn peer(id: &str) -> PeerId {
        PeerId::parse(id).unwrap()
    }

    struct Harness {
        transport: Arc<MemoryTransport>,
        coordinator: MeshCoordinator<ElementSetReconciler>,
        _inputs: UnboundedReceiver<ChannelInput>,
    }

    fn harness(identity: &str, policy: MembershipPolicy) -> Harness {
        let transport = Arc::new(MemoryTransport::new());
        let (inbox, inputs) = mpsc::unbounded_channel();
        let coordinator = MeshCoordinator::new(
            peer(identity),
            policy,
            transport.clone(),
            ElementSetReconciler::default(),
            inbox,
        );
        Harness {
            transport,
            coordinator,
            _inputs: inputs,
        }
    }

    /// Remote end of a channel the coordinator opened to `id`
    struct Remote {
        _outbound: UnboundedSender<Vec<u8>>,
        inbound: UnboundedReceiver<Vec<u8>>,
    }

    impl Remote {
        fn next(&mut self) -> Option<MeshMessage> {
            self.inbound
                .try_recv()
                .ok()
                .map(|bytes| MeshMessage::from_bytes(&bytes).unwrap())
        }

        fn drain(&mut self) -> Vec<MeshMessage> {
            std::iter::from_fn(|| self.next()).collect()
        }
    }

    fn connect(h: &mut Harness, id: &str) -> (ChannelId, Remote) {
        let mut listener = h.transport.listen(&peer(id)).unwrap();
        assert!(h.coordinator.connect_to(&peer(id)));
        let channel = listener.try_recv().unwrap();
        let cid = channel.id();
        let (outbound, inbound) = channel.into_parts();
        (
            cid,
            Remote {
                _outbound: outbound,
                inbound,
            },
        )
    }

    fn channel_of(h: &Harness, id: &str) -> ChannelId {
        h.coordinator.link_to(&peer(id)).unwrap()
    }

    #[tokio::test]
    async fn test_connect_sends_hello_and_extends_view() {
        let mut h = harness("a", MembershipPolicy::Stamped);
        let mut views = h.coordinator.subscribe();
        let (_, mut b) = connect(&mut h, "b");

        assert_eq!(
            b.next(),
            Some(MeshMessage::Hello {
                my_identity: peer("a")
            })
        );
        assert_eq!(h.coordinator.current_view().to_vec(), vec![peer("a"), peer("b")]);
        assert_eq!(views.try_recv().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_connect_to_self_or_known_peer_is_noop() {
        let mut h = harness("a", MembershipPolicy::Stamped);
        let (_, _b) = connect(&mut h, "b");

        assert!(!h.coordinator.connect_to(&peer("a")));
        assert!(!h.coordinator.connect_to(&peer("b")));
        assert_eq!(h.coordinator.channel_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_peer_is_logged_only() {
        let mut h = harness("a", MembershipPolicy::Stamped);
        assert!(!h.coordinator.connect_to(&peer("ghost")));
        assert_eq!(h.coordinator.current_view().len(), 1);
    }

    #[tokio::test]
    async fn test_hello_broadcasts_sync_to_every_channel() {
        let mut h = harness("a", MembershipPolicy::Stamped);
        let el = Element::new("e1").with("shape", "rect");
        h.coordinator.create_update(vec![el.clone()]);

        let (cb, mut b) = connect(&mut h, "b");
        let (_, mut c) = connect(&mut h, "c");
        b.drain();
        c.drain();

        h.coordinator.handle_command(cb, MeshMessage::Hello { my_identity: peer("b") });

        for remote in [&mut b, &mut c] {
            match remote.next() {
                Some(MeshMessage::Sync {
                    peers_in_room,
                    data,
                    epoch,
                }) => {
                    assert_eq!(peers_in_room, vec![peer("a"), peer("b"), peer("c")]);
                    assert_eq!(data, Some(vec![el.clone()]));
                    assert!(epoch.is_some());
                }
                other => panic!("Expected Sync message, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_eager_prunes_on_first_list() {
        let mut h = harness("a", MembershipPolicy::Eager);
        let (cs, _s) = connect(&mut h, "s");
        let (_, mut p) = connect(&mut h, "p");
        p.drain();

        h.coordinator.handle_command(
            cs,
            MeshMessage::Update {
                peers_in_room: vec![peer("a"), peer("s")],
                update: vec![],
                epoch: None,
            },
        );

        assert!(!h.coordinator.current_view().contains(&peer("p")));
        assert!(p.inbound.recv().await.is_none(), "channel to p should be closed");
    }

    #[tokio::test]
    async fn test_eager_opens_channels_to_listed_peers_without_hello() {
        let mut h = harness("a", MembershipPolicy::Eager);
        let (cs, _s) = connect(&mut h, "s");
        let mut listener = h.transport.listen(&peer("q")).unwrap();

        h.coordinator.handle_command(
            cs,
            MeshMessage::Sync {
                peers_in_room: vec![peer("a"), peer("s"), peer("q")],
                data: None,
                epoch: None,
            },
        );

        assert!(h.coordinator.current_view().contains(&peer("q")));
        let (_, mut inbound) = listener.try_recv().unwrap().into_parts();
        assert!(inbound.try_recv().is_err(), "direct joins carry no hello");
    }

    #[tokio::test]
    async fn test_stamped_prunes_only_withdrawn_peers() {
        let mut h = harness("a", MembershipPolicy::Stamped);
        let (cs, _s) = connect(&mut h, "s");
        let (_, _p) = connect(&mut h, "p");

        let list = |peers: &[&str], epoch| MeshMessage::Sync {
            peers_in_room: peers.iter().map(|id| peer(id)).collect(),
            data: None,
            epoch: Some(epoch),
        };

        // s has not heard of p yet: no pruning.
        h.coordinator.handle_command(cs, list(&["a", "s"], 1));
        assert!(h.coordinator.current_view().contains(&peer("p")));

        h.coordinator.handle_command(cs, list(&["a", "s", "p"], 2));
        // A reordered, older list is ignored.
        h.coordinator.handle_command(cs, list(&["a", "s"], 1));
        assert!(h.coordinator.current_view().contains(&peer("p")));

        h.coordinator.handle_command(cs, list(&["a", "s"], 3));
        assert!(!h.coordinator.current_view().contains(&peer("p")));
    }

    #[tokio::test]
    async fn test_stamped_reannounces_unknown_peers() {
        let mut h = harness("a", MembershipPolicy::Stamped);
        let (cs, mut s) = connect(&mut h, "s");
        let (_, _p) = connect(&mut h, "p");
        s.drain();

        h.coordinator.handle_command(
            cs,
            MeshMessage::Sync {
                peers_in_room: vec![peer("a"), peer("s")],
                data: None,
                epoch: Some(1),
            },
        );

        match s.next() {
            Some(MeshMessage::Sync { peers_in_room, .. }) => {
                assert_eq!(peers_in_room, vec![peer("a"), peer("p"), peer("s")]);
            }
            other => panic!("Expected Sync message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_same_view_is_reannounced_once_per_channel() {
        let mut h = harness("a", MembershipPolicy::Stamped);
        let (cs, mut s) = connect(&mut h, "s");
        let (_, _p) = connect(&mut h, "p");
        s.drain();
        let without_p = |epoch| MeshMessage::Sync {
            peers_in_room: vec![peer("a"), peer("s")],
            data: None,
            epoch: Some(epoch),
        };

        h.coordinator.handle_command(cs, without_p(1));
        assert_eq!(s.drain().len(), 1);

        // s still cannot reach p; nothing new to tell it
        h.coordinator.handle_command(cs, without_p(2));
        assert!(s.drain().is_empty());

        let (_, _q) = connect(&mut h, "q");
        h.coordinator.handle_command(cs, without_p(3));
        match s.next() {
            Some(MeshMessage::Sync { peers_in_room, .. }) => {
                assert_eq!(peers_in_room, vec![peer("a"), peer("p"), peer("q"), peer("s")]);
            }
            other => panic!("Expected Sync message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_is_merged() {
        let mut h = harness("a", MembershipPolicy::Stamped);
        let (cs, _s) = connect(&mut h, "s");
        let el = Element::new("e1");

        let bytes = MeshMessage::Update {
            peers_in_room: vec![peer("a"), peer("s")],
            update: vec![el.clone()],
            epoch: Some(1),
        }
        .to_bytes()
        .unwrap();
        h.coordinator.handle_frame(cs, &bytes);

        assert_eq!(h.coordinator.reconciler().create_full_state_update(), vec![el]);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_dropped() {
        let mut h = harness("a", MembershipPolicy::Stamped);
        let (cs, _s) = connect(&mut h, "s");

        h.coordinator.handle_frame(cs, b"{\"command\":\"wave\"}");
        h.coordinator.handle_frame(cs, b"garbage");

        assert_eq!(h.coordinator.channel_count(), 1);
        assert!(h.coordinator.reconciler().create_full_state_update().is_empty());
    }

    #[tokio::test]
    async fn test_local_edit_is_broadcast() {
        let mut h = harness("a", MembershipPolicy::Stamped);
        let (_, mut b) = connect(&mut h, "b");
        let (_, mut c) = connect(&mut h, "c");
        b.drain();
        c.drain();

        let el = Element::new("e1").with("shape", "rect");
        h.coordinator.create_update(vec![el.clone()]);

        for remote in [&mut b, &mut c] {
            match remote.next() {
                Some(MeshMessage::Update { update, .. }) => assert_eq!(update, vec![el.clone()]),
                other => panic!("Expected Update message, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_remote_close_and_failed_send_drop_channel() {
        let mut h = harness("a", MembershipPolicy::Stamped);
        let (cb, _b) = connect(&mut h, "b");
        let (_, c) = connect(&mut h, "c");

        h.coordinator.handle_input(ChannelInput::Closed(cb));
        assert!(!h.coordinator.current_view().contains(&peer("b")));

        drop(c);
        h.coordinator.create_update(vec![Element::new("e1")]);
        assert_eq!(h.coordinator.current_view().to_vec(), vec![peer("a")]);

        // A second close for the same channel is a no-op.
        h.coordinator.handle_input(ChannelInput::Closed(cb));
    }

    #[tokio::test]
    async fn test_duplicate_channel_keeps_smaller_initiator() {
        // "a" < "b": the a->b channel survives on both ends.
        let mut a = harness("a", MembershipPolicy::Stamped);
        let (_, _b_end) = connect(&mut a, "b");
        let kept = channel_of(&a, "b");

        let mut a_listener = a.transport.listen(&peer("a")).unwrap();
        a.transport.connect(&peer("b"), &peer("a")).unwrap();
        a.coordinator.accept(a_listener.try_recv().unwrap());
        assert_eq!(a.coordinator.channel_count(), 1);
        assert_eq!(channel_of(&a, "b"), kept);

        let mut b = harness("b", MembershipPolicy::Stamped);
        let (_, mut a_end) = connect(&mut b, "a");
        a_end.drain();

        let mut b_listener = b.transport.listen(&peer("b")).unwrap();
        let from_a = b.transport.connect(&peer("a"), &peer("b")).unwrap();
        let winner = from_a.id();
        b.coordinator.accept(b_listener.try_recv().unwrap());

        assert_eq!(b.coordinator.channel_count(), 1);
        assert_eq!(channel_of(&b, "a"), winner);

        // The hello sent on the replaced channel is repeated on the survivor.
        let (outbound, inbound) = from_a.into_parts();
        let mut survivor = Remote {
            _outbound: outbound,
            inbound,
        };
        assert_eq!(
            survivor.next(),
            Some(MeshMessage::Hello {
                my_identity: peer("b")
            })
        );
    }

    #[tokio::test]
    async fn test_disconnect_closes_everything() {
        let mut h = harness("a", MembershipPolicy::Stamped);
        let (_, mut b) = connect(&mut h, "b");
        let mut views = h.coordinator.subscribe();

        h.coordinator.disconnect();

        assert_eq!(h.coordinator.current_view().to_vec(), vec![peer("a")]);
        assert_eq!(views.try_recv().unwrap().len(), 1);
        b.drain();
        assert!(b.inbound.recv().await.is_none());
    }
}
