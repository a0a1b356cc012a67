//! Versioned document elements and the merge rule

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// One independently addressable unit of the shared document.
///
/// Only `id`, `version`, `versionNonce` and `deleted` are interpreted. Every
/// other attribute lands in `payload` and is replaced wholesale when an
/// incoming version wins the merge, never merged field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: String,
    pub version: u64,
    pub version_nonce: String,
    pub deleted: bool,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Element {
    /// A freshly created element at version 1
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: 1,
            version_nonce: fresh_nonce(),
            deleted: false,
            payload: Map::new(),
        }
    }

    /// Builder-style payload attribute, does not count as a mutation
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Set a payload attribute as a local mutation
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.payload.insert(key.into(), value.into());
        self.touch();
    }

    /// Tombstone the element as a local mutation
    pub fn delete(&mut self) {
        self.deleted = true;
        self.touch();
    }

    /// Record a local mutation: bump the version and draw a new nonce.
    ///
    /// Versions stop at `u64::MAX`. Past that point edits to the element only
    /// win through the nonce tie-break.
    pub fn touch(&mut self) {
        self.version = self.version.saturating_add(1);
        self.version_nonce = fresh_nonce();
    }

    /// Ordering under the merge rule; `Greater` means `self` beats `other`.
    ///
    /// Higher version wins; on equal versions the smaller nonce wins. Two
    /// elements with identical version and nonce but different content only
    /// arise from a misbehaving peer; they are ordered by content so that
    /// every node still picks the same winner.
    pub fn merge_order(&self, other: &Element) -> Ordering {
        self.version
            .cmp(&other.version)
            .then_with(|| other.version_nonce.cmp(&self.version_nonce))
            .then_with(|| self.deleted.cmp(&other.deleted))
            .then_with(|| payload_key(&self.payload).cmp(&payload_key(&other.payload)))
    }

    /// Whether this (incoming) element replaces `local`
    pub fn supersedes(&self, local: &Element) -> bool {
        self.merge_order(local) == Ordering::Greater
    }

    /// Same payload and tombstone flag, ignoring version metadata
    pub fn same_content(&self, other: &Element) -> bool {
        self.deleted == other.deleted && self.payload == other.payload
    }
}

fn payload_key(payload: &Map<String, Value>) -> String {
    Value::Object(payload.clone()).to_string()
}

/// A new random version nonce
pub fn fresh_nonce() -> String {
    format!("{:016x}", rand::thread_rng().gen::<u64>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn element(version: u64, nonce: &str) -> Element {
        Element {
            id: "e1".to_string(),
            version,
            version_nonce: nonce.to_string(),
            deleted: false,
            payload: Map::new(),
        }
    }

    #[test]
    fn test_smaller_nonce_wins_version_tie() {
        let local = element(3, "b");
        let incoming = element(3, "a");

        assert!(incoming.supersedes(&local));
        assert!(!local.supersedes(&incoming));
    }

    #[test]
    fn test_higher_version_wins_regardless_of_nonce() {
        let local = element(3, "a");
        let incoming = element(2, "z");

        assert!(!incoming.supersedes(&local));
        assert!(local.supersedes(&incoming));
    }

    #[test]
    fn test_identical_element_does_not_supersede() {
        let local = element(3, "a");
        assert!(!local.clone().supersedes(&local));
    }

    #[test]
    fn test_content_breaks_full_tie_deterministically() {
        let mut a = element(3, "a");
        let mut b = element(3, "a");
        a.payload.insert("shape".to_string(), json!("rect"));
        b.payload.insert("shape".to_string(), json!("ellipse"));

        assert_ne!(a.supersedes(&b), b.supersedes(&a));
    }

    #[test]
    fn test_local_mutations_bump_version_and_nonce() {
        let mut el = Element::new("e1").with("shape", "rect");
        assert_eq!(el.version, 1);
        let nonce = el.version_nonce.clone();

        el.set("shape", "ellipse");
        assert_eq!(el.version, 2);
        assert_ne!(el.version_nonce, nonce);

        el.delete();
        assert!(el.deleted);
        assert_eq!(el.version, 3);
    }

    #[test]
    fn test_touch_saturates_at_max_version() {
        let mut el = element(u64::MAX, "n1");
        el.touch();

        assert_eq!(el.version, u64::MAX);
        assert_ne!(el.version_nonce, "n1");
        assert!(el.supersedes(&element(u64::MAX - 1, "a")));
    }

    #[test]
    fn test_wire_shape() {
        let el = Element {
            id: "e1".to_string(),
            version: 1,
            version_nonce: "n1".to_string(),
            deleted: false,
            payload: Map::new(),
        }
        .with("shape", "rect");

        let value = serde_json::to_value(&el).unwrap();
        assert_eq!(
            value,
            json!({"id": "e1", "version": 1, "versionNonce": "n1", "deleted": false, "shape": "rect"})
        );

        let parsed: Element = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, el);
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let value = json!({"id": "e1", "version": 1, "deleted": false});
        assert!(serde_json::from_value::<Element>(value).is_err());
    }
}
