//! Signaling wire frames
//!
//! All frames are JSON text. The inbound [`Envelope`] is deliberately loose
//! (`type` is an open string because negotiation kinds like `offer`,
//! `answer` or `candidate` are opaque to the relay); it is classified into
//! the closed [`ClientFrame`] variant before any routing decision.
//!
//! The `id` field is asymmetric by design: inbound it names the *target*
//! peer, outbound it carries the *sender's* code.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Frame type tag reserved for nickname updates
pub const UPDATE_NICKNAME: &str = "update_nickname";

/// Raw inbound wire shape
#[derive(Clone, Debug, Deserialize)]
pub struct Envelope {
    /// Target peer code (may be empty for metadata frames)
    #[serde(default)]
    pub id: String,

    /// Frame kind; anything other than `update_nickname` is relayed opaquely
    #[serde(rename = "type")]
    pub kind: String,

    /// Opaque negotiation payload, or the new nickname for metadata frames
    pub description: Option<String>,
}

/// Classified inbound frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientFrame {
    /// Change the sender's visible nickname; never forwarded to peers
    UpdateNickname { nickname: String },

    /// Forward the payload to the addressed peer
    Relay {
        target: String,
        kind: String,
        description: Option<String>,
    },
}

impl ClientFrame {
    /// Parse and classify a raw inbound frame
    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        let env: Envelope = serde_json::from_str(raw)?;
        Ok(env.classify())
    }
}

impl Envelope {
    /// Classify into the closed frame variant.
    ///
    /// An `update_nickname` without a description is not a nickname change;
    /// it falls through to the relay rule and drops on the (empty) target.
    pub fn classify(self) -> ClientFrame {
        match (self.kind.as_str(), self.description) {
            (UPDATE_NICKNAME, Some(nickname)) => ClientFrame::UpdateNickname { nickname },
            (_, description) => ClientFrame::Relay {
                target: self.id,
                kind: self.kind,
                description,
            },
        }
    }
}

/// One peer as seen in a presence snapshot
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerEntry {
    pub id: String,
    pub nickname: String,
}

/// Server-pushed presence frames
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Sent once, immediately after registration
    Init { id: String, ids: Vec<PeerEntry> },

    /// Sent whenever the recipient's view of other peers changes
    Update { ids: Vec<PeerEntry> },
}

impl ServerFrame {
    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Relay passthrough frame; `id` is the sender's code
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayFrame {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RelayFrame {
    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_classification() {
        let frame =
            ClientFrame::from_json(r#"{"id":"111111","type":"offer","description":"sdp"}"#)
                .unwrap();
        assert_eq!(
            frame,
            ClientFrame::Relay {
                target: "111111".into(),
                kind: "offer".into(),
                description: Some("sdp".into()),
            }
        );
    }

    #[test]
    fn test_nickname_classification() {
        let frame =
            ClientFrame::from_json(r#"{"type":"update_nickname","description":"alice"}"#).unwrap();
        assert_eq!(
            frame,
            ClientFrame::UpdateNickname {
                nickname: "alice".into()
            }
        );
    }

    #[test]
    fn test_nickname_without_description_falls_through_to_relay() {
        let frame = ClientFrame::from_json(r#"{"type":"update_nickname"}"#).unwrap();
        assert_eq!(
            frame,
            ClientFrame::Relay {
                target: String::new(),
                kind: UPDATE_NICKNAME.into(),
                description: None,
            }
        );
    }

    #[test]
    fn test_malformed_frame() {
        assert!(ClientFrame::from_json("not json").is_err());
        assert!(ClientFrame::from_json(r#"{"id":"123456"}"#).is_err());
    }

    #[test]
    fn test_init_wire_shape() {
        let frame = ServerFrame::Init {
            id: "222222".into(),
            ids: vec![PeerEntry {
                id: "111111".into(),
                nickname: String::new(),
            }],
        };
        let json = frame.to_json().unwrap();
        assert!(json.contains(r#""type":"init""#));
        assert!(json.contains(r#""id":"222222""#));
        assert!(json.contains(r#""ids":[{"id":"111111","nickname":""}]"#));
    }

    #[test]
    fn test_update_wire_shape() {
        let frame = ServerFrame::Update { ids: vec![] };
        assert_eq!(frame.to_json().unwrap(), r#"{"type":"update","ids":[]}"#);
    }

    #[test]
    fn test_relay_frame_omits_absent_description() {
        let frame = RelayFrame {
            id: "222222".into(),
            kind: "bye".into(),
            description: None,
        };
        assert_eq!(frame.to_json().unwrap(), r#"{"id":"222222","type":"bye"}"#);

        let frame = RelayFrame {
            id: "222222".into(),
            kind: "offer".into(),
            description: Some("sdp".into()),
        };
        assert_eq!(
            frame.to_json().unwrap(),
            r#"{"id":"222222","type":"offer","description":"sdp"}"#
        );
    }
}
