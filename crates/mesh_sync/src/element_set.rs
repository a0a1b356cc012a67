//! Reconciler for vector-graphics scenes reported as whole element sets

use crate::bus::Subscribers;
use crate::reconciler::{Reconciler, Update};
use crate::store::ElementStore;
use tokio::sync::mpsc::UnboundedReceiver;

/// Reconciler for editors that report their entire scene after every change.
///
/// A local delta is every element whose nonce differs from the saved
/// snapshot. Remote merges advance the snapshot too, so elements that arrived
/// from peers are not sent back out as local edits.
#[derive(Debug, Default)]
pub struct ElementSetReconciler {
    store: ElementStore,
    received: Subscribers<Update>,
    created: Subscribers<Update>,
}

impl ElementSetReconciler {
    pub fn new(initial_state: Update) -> Self {
        Self {
            store: ElementStore::from_elements(initial_state),
            received: Subscribers::new(),
            created: Subscribers::new(),
        }
    }

    pub fn store(&self) -> &ElementStore {
        &self.store
    }
}

impl Reconciler for ElementSetReconciler {
    fn apply_update(&mut self, update: Update) {
        let incoming = update.len();
        let taken = self.store.merge_all(update).len();
        self.store.save_snapshot();
        tracing::debug!(incoming, taken, "applied element update");

        let snapshot = self.store.snapshot();
        self.received.publish(&snapshot);
    }

    fn create_full_state_update(&self) -> Update {
        self.store.snapshot()
    }

    fn create_update(&mut self, new_full_state: Update) -> Option<Update> {
        let changed: Update = new_full_state
            .into_iter()
            .filter(|el| self.store.differs_from_saved(el))
            .collect();

        // A stale editor copy loses the merge and is not broadcast.
        let delta = self.store.merge_all(changed);
        self.store.save_snapshot();

        if delta.is_empty() {
            return None;
        }

        tracing::debug!(changed = delta.len(), "created local update");
        self.created.publish(&delta);
        Some(delta)
    }

    fn subscribe_received_updates(&mut self) -> UnboundedReceiver<Update> {
        self.received.subscribe()
    }

    fn subscribe_created_updates(&mut self) -> UnboundedReceiver<Update> {
        self.created.subscribe()
    }
}
