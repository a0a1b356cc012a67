//! Mesh protocol message types

use crate::identity::PeerId;
use crate::reconciler::Update;
use crate::SyncError;
use serde::{Deserialize, Serialize};

/// Messages exchanged between peers, one per transport frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum MeshMessage {
    /// First message on a freshly opened outgoing channel
    #[serde(rename_all = "camelCase")]
    Hello { my_identity: PeerId },

    /// Membership announcement, optionally with the full document
    #[serde(rename_all = "camelCase")]
    Sync {
        peers_in_room: Vec<PeerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Update>,
        /// Sender's membership epoch; absent from unstamped peers
        #[serde(default, skip_serializing_if = "Option::is_none")]
        epoch: Option<u64>,
    },

    /// Locally created delta
    #[serde(rename_all = "camelCase")]
    Update {
        peers_in_room: Vec<PeerId>,
        update: Update,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        epoch: Option<u64>,
    },
}

impl MeshMessage {
    /// Serialize message to JSON bytes
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize message from JSON bytes
    /// Well-formed JSON of the wrong shape is an `InvalidMessage`; anything
    /// that is not JSON at all is a `SerializationError`.
    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            if e.is_data() {
                SyncError::InvalidMessage(e.to_string())
            } else {
                SyncError::from(e)
            }
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MeshMessage::Hello { .. } => "hello",
            MeshMessage::Sync { .. } => "sync",
            MeshMessage::Update { .. } => "update",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hello_wire_shape() {
        let msg = MeshMessage::Hello {
            my_identity: PeerId::parse("peer-a").unwrap(),
        };
        let value: serde_json::Value = serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(value, json!({"command": "hello", "myIdentity": "peer-a"}));
    }

    #[test]
    fn test_sync_without_data_or_epoch() {
        let bytes = br#"{"command":"sync","peersInRoom":["a","b"]}"#;
        match MeshMessage::from_bytes(bytes).unwrap() {
            MeshMessage::Sync {
                peers_in_room,
                data,
                epoch,
            } => {
                assert_eq!(peers_in_room.len(), 2);
                assert!(data.is_none());
                assert!(epoch.is_none());
            }
            other => panic!("Expected Sync message, got {:?}", other),
        }
    }

    #[test]
    fn test_update_carries_elements() {
        let bytes = br#"{"command":"update","peersInRoom":["a"],"epoch":4,
            "update":[{"id":"e1","version":1,"versionNonce":"n1","deleted":false,"shape":"rect"}]}"#;
        match MeshMessage::from_bytes(bytes).unwrap() {
            MeshMessage::Update { update, epoch, .. } => {
                assert_eq!(epoch, Some(4));
                assert_eq!(update[0].id, "e1");
                assert_eq!(update[0].payload["shape"], json!("rect"));
            }
            other => panic!("Expected Update message, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_messages_rejected() {
        assert!(matches!(
            MeshMessage::from_bytes(br#"{"command":"bye"}"#),
            Err(SyncError::InvalidMessage(_))
        ));
        assert!(matches!(
            MeshMessage::from_bytes(br#"{"command":"update","peersInRoom":[]}"#),
            Err(SyncError::InvalidMessage(_))
        ));
        assert!(matches!(
            MeshMessage::from_bytes(b"not json"),
            Err(SyncError::SerializationError(_))
        ));
    }
}
