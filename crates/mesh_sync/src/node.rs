//! Node actor: one task per participant
//!
//! API calls, accepted channels and channel frames all funnel into a single
//! task, and each is handled to completion before the next one starts. The
//! element store and the channel set are therefore never touched concurrently.

use crate::config::SyncConfig;
use crate::identity::{IdentityProvider, PeerId};
use crate::mesh::{ChannelInput, MeshCoordinator, MeshView};
use crate::reconciler::{Reconciler, Update};
use crate::transport::{Channel, Transport};
use crate::{Result, SyncError};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

type Job<R> = Box<dyn FnOnce(&mut R) + Send>;

enum Command<R> {
    ConnectTo(PeerId),
    Disconnect,
    View(oneshot::Sender<MeshView>),
    Subscribe(oneshot::Sender<UnboundedReceiver<MeshView>>),
    Edit(Update, oneshot::Sender<Option<Update>>),
    Reconcile(Job<R>),
    Shutdown(oneshot::Sender<()>),
}

/// A running participant
pub struct MeshNode<R: Reconciler> {
    coordinator: MeshCoordinator<R>,
    commands: UnboundedReceiver<Command<R>>,
    incoming: UnboundedReceiver<Channel>,
    inputs: UnboundedReceiver<ChannelInput>,
}

impl<R: Reconciler> MeshNode<R> {
    /// Resolve the identity, start listening on `transport` and run the node
    /// on a new tokio task.
    pub fn spawn(
        config: &SyncConfig,
        identity: &dyn IdentityProvider,
        transport: Arc<dyn Transport>,
        reconciler: R,
    ) -> Result<NodeHandle<R>> {
        config.validate()?;
        let identity = identity.provide()?;
        let incoming = transport.listen(&identity)?;

        let (inbox, inputs) = mpsc::unbounded_channel();
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let coordinator =
            MeshCoordinator::new(identity.clone(), config.membership, transport, reconciler, inbox);

        let node = Self {
            coordinator,
            commands,
            incoming,
            inputs,
        };
        tokio::spawn(node.run());
        tracing::info!(identity = %identity, policy = %config.membership, "mesh node started");

        Ok(NodeHandle {
            identity,
            commands: commands_tx,
        })
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if !self.execute(command) {
                            break;
                        }
                    }
                    None => {
                        tracing::debug!("all handles dropped");
                        self.coordinator.disconnect();
                        break;
                    }
                },
                Some(channel) = self.incoming.recv() => self.coordinator.accept(channel),
                Some(input) = self.inputs.recv() => self.coordinator.handle_input(input),
            }
            self.coordinator.flush_created_updates();
        }
        tracing::info!(identity = %self.coordinator.identity(), "mesh node stopped");
    }

    /// Returns false once the node should stop
    fn execute(&mut self, command: Command<R>) -> bool {
        match command {
            Command::ConnectTo(peer) => {
                self.coordinator.connect_to(&peer);
            }
            Command::Disconnect => self.coordinator.disconnect(),
            Command::View(reply) => {
                let _ = reply.send(self.coordinator.current_view());
            }
            Command::Subscribe(reply) => {
                let _ = reply.send(self.coordinator.subscribe());
            }
            Command::Edit(state, reply) => {
                let delta = self.coordinator.create_update(state);
                let _ = reply.send(delta);
            }
            Command::Reconcile(job) => {
                job(self.coordinator.reconciler_mut());
                self.coordinator.flush_created_updates();
            }
            Command::Shutdown(reply) => {
                self.coordinator.disconnect();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }
}

/// Cloneable handle to a running [`MeshNode`].
///
/// Dropping the last handle stops the node.
pub struct NodeHandle<R> {
    identity: PeerId,
    commands: UnboundedSender<Command<R>>,
}

impl<R> Clone for NodeHandle<R> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            commands: self.commands.clone(),
        }
    }
}

impl<R: Reconciler> NodeHandle<R> {
    pub fn identity(&self) -> &PeerId {
        &self.identity
    }

    /// Ask the node to open a channel to `peer`
    pub fn connect_to(&self, peer: PeerId) -> Result<()> {
        self.send(Command::ConnectTo(peer))
    }

    /// Close every channel without notifying peers
    pub fn disconnect(&self) -> Result<()> {
        self.send(Command::Disconnect)
    }

    pub async fn current_view(&self) -> Result<MeshView> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::View(tx))?;
        rx.await.map_err(|_| SyncError::NodeStopped)
    }

    /// Receive the view after every change to the node's channel set
    pub async fn subscribe(&self) -> Result<UnboundedReceiver<MeshView>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Subscribe(tx))?;
        rx.await.map_err(|_| SyncError::NodeStopped)
    }

    /// Record a local edit; the delta (if any) is broadcast before this returns
    pub async fn edit(&self, new_full_state: Update) -> Result<Option<Update>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Edit(new_full_state, tx))?;
        rx.await.map_err(|_| SyncError::NodeStopped)
    }

    /// Run `f` against the node's reconciler on the node task
    pub async fn with_reconciler<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut R) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Reconcile(Box::new(move |reconciler: &mut R| {
            let _ = tx.send(f(reconciler));
        })))?;
        rx.await.map_err(|_| SyncError::NodeStopped)
    }

    pub async fn full_state(&self) -> Result<Update> {
        self.with_reconciler(|r| r.create_full_state_update()).await
    }

    /// Receive the full document after every merge of a peer's update
    pub async fn subscribe_received(&self) -> Result<UnboundedReceiver<Update>> {
        self.with_reconciler(|r| r.subscribe_received_updates()).await
    }

    /// Close all channels and stop the node task
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx))?;
        rx.await.map_err(|_| SyncError::NodeStopped)
    }

    fn send(&self, command: Command<R>) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| SyncError::NodeStopped)
    }
}
