//! Reconciler for freeform canvases that report one object at a time

use crate::bus::Subscribers;
use crate::element::Element;
use crate::reconciler::{Reconciler, Update};
use crate::store::ElementStore;
use tokio::sync::mpsc::UnboundedReceiver;

/// Reconciler for canvases that emit an event per modified object.
///
/// Canvas events fire for objects whose content did not actually change (for
/// instance when a merged remote object is redrawn), so a change is detected
/// by comparing payload and tombstone rather than version metadata.
#[derive(Debug, Default)]
pub struct CanvasReconciler {
    store: ElementStore,
    received: Subscribers<Update>,
    created: Subscribers<Update>,
}

impl CanvasReconciler {
    pub fn new(objects: Update) -> Self {
        Self {
            store: ElementStore::from_elements(objects),
            received: Subscribers::new(),
            created: Subscribers::new(),
        }
    }

    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    /// Record a single modified object; publishes `[object]` when it changed.
    pub fn create_object_update(&mut self, object: Element) -> Option<Update> {
        let taken = self.record_local(object)?;
        let delta = vec![taken];
        self.created.publish(&delta);
        Some(delta)
    }

    /// Drop all local objects, e.g. before loading a different board
    pub fn clear(&mut self) {
        tracing::debug!(objects = self.store.len(), "clearing canvas state");
        self.store.clear();
    }

    fn record_local(&mut self, object: Element) -> Option<Element> {
        if let Some(prev) = self.store.get(&object.id) {
            if prev.same_content(&object) {
                return None;
            }
        }

        let taken = object.clone();
        if self.store.merge(object) {
            Some(taken)
        } else {
            tracing::debug!(id = %taken.id, "ignoring stale local object");
            None
        }
    }
}

impl Reconciler for CanvasReconciler {
    fn apply_update(&mut self, update: Update) {
        let winners = self.store.merge_all(update);
        tracing::debug!(redrawn = winners.len(), "applied canvas update");

        let snapshot = self.store.snapshot();
        self.received.publish(&snapshot);
    }

    fn create_full_state_update(&self) -> Update {
        self.store.snapshot()
    }

    fn create_update(&mut self, new_full_state: Update) -> Option<Update> {
        let delta: Update = new_full_state
            .into_iter()
            .filter_map(|object| self.record_local(object))
            .collect();

        if delta.is_empty() {
            return None;
        }
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
