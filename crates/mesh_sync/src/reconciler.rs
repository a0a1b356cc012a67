//! The update-manager contract the mesh coordinates around

use crate::element::Element;
use tokio::sync::mpsc::UnboundedReceiver;

/// A batch of element versions, full or partial
pub type Update = Vec<Element>;

/// Convergent merge/state component of one node, independent of networking.
///
/// Each document type implements this with its own change detection; the
/// merge rule itself is shared through [`crate::ElementStore`].
pub trait Reconciler: Send + 'static {
    /// Merge `update` into the local state, then publish the resulting full
    /// snapshot to received-update subscribers.
    fn apply_update(&mut self, update: Update);

    /// Full local state, suitable for a `sync` message.
    fn create_full_state_update(&self) -> Update;

    /// Record a local edit given the complete new local state. Publishes and
    /// returns the changed subset, or `None` when nothing changed.
    fn create_update(&mut self, new_full_state: Update) -> Option<Update>;

    /// Listen for full snapshots produced by [`Reconciler::apply_update`].
    fn subscribe_received_updates(&mut self) -> UnboundedReceiver<Update>;

    /// Listen for deltas produced by local edits.
    fn subscribe_created_updates(&mut self) -> UnboundedReceiver<Update>;
}
