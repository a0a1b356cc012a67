//! Materialized document state

use crate::element::Element;
use std::collections::HashMap;

/// Latest known version of every element, keyed by id, plus the snapshot
/// that local deltas are computed against.
///
/// Elements are never removed by merging: deletion is the `deleted` flag, so
/// a late stale copy of a deleted element loses against its tombstone.
#[derive(Debug, Clone, Default)]
pub struct ElementStore {
    elements: HashMap<String, Element>,
    saved: HashMap<String, Element>,
}

impl ElementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `elements`; the seed is also the saved snapshot
    pub fn from_elements(elements: impl IntoIterator<Item = Element>) -> Self {
        let mut store = Self::new();
        store.merge_all(elements);
        store.save_snapshot();
        store
    }

    /// Merge one incoming element, returning whether it was taken
    pub fn merge(&mut self, incoming: Element) -> bool {
        match self.elements.get(&incoming.id) {
            Some(local) if !incoming.supersedes(local) => false,
            _ => {
                self.elements.insert(incoming.id.clone(), incoming);
                true
            }
        }
    }

    /// Merge a batch, returning the elements that won
    pub fn merge_all(&mut self, incoming: impl IntoIterator<Item = Element>) -> Vec<Element> {
        incoming
            .into_iter()
            .filter_map(|el| {
                let winner = el.clone();
                self.merge(el).then_some(winner)
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Element as of the last saved snapshot
    pub fn saved(&self, id: &str) -> Option<&Element> {
        self.saved.get(id)
    }

    /// True when `candidate` is new or carries a different nonce than the
    /// saved snapshot
    pub fn differs_from_saved(&self, candidate: &Element) -> bool {
        self.saved
            .get(&candidate.id)
            .map_or(true, |prev| prev.version_nonce != candidate.version_nonce)
    }

    pub fn save_snapshot(&mut self) {
        self.saved = self.elements.clone();
    }

    /// All elements, ordered by id
    pub fn snapshot(&self) -> Vec<Element> {
        let mut elements: Vec<Element> = self.elements.values().cloned().collect();
        elements.sort_by(|a, b| a.id.cmp(&b.id));
        elements
    }

    /// Forget everything, including the saved snapshot
    pub fn clear(&mut self) {
        self.elements.clear();
        self.saved.clear();
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
