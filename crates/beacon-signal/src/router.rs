//! Inbound frame routing
//!
//! Classifies each raw frame from a session and either applies a metadata
//! update or relays the payload to the addressed peer. Routing performs no
//! semantic validation of negotiation content; beyond the sender-id rewrite
//! the envelope passes through untouched.

use std::sync::Arc;

use tracing::debug;

use beacon_core::{ClientFrame, RelayFrame};

use crate::broadcast::PresenceBroadcaster;
use crate::registry::SessionRegistry;

pub struct MessageRouter {
    registry: Arc<SessionRegistry>,
    broadcaster: PresenceBroadcaster,
}

impl MessageRouter {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        let broadcaster = PresenceBroadcaster::new(registry.clone());
        Self {
            registry,
            broadcaster,
        }
    }

    pub fn broadcaster(&self) -> &PresenceBroadcaster {
        &self.broadcaster
    }

    /// Handle one raw text frame from session `sender_id`.
    ///
    /// Malformed frames and unknown targets are dropped without any reply;
    /// the sender learns nothing either way.
    pub fn handle_frame(&self, sender_id: &str, raw: &str) {
        let frame = match ClientFrame::from_json(raw) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("dropping malformed frame from {}: {}", sender_id, e);
                return;
            }
        };

        match frame {
            ClientFrame::UpdateNickname { nickname } => {
                if !self.registry.set_nickname(sender_id, &nickname) {
                    debug!("nickname update for unregistered session {}", sender_id);
                    return;
                }
                // Everyone else sees the new name; the sender's own
                // snapshot never includes itself, so it is skipped.
                self.broadcaster.broadcast(Some(sender_id));
            }

            ClientFrame::Relay {
                target,
                kind,
                description,
            } => {
                let forwarded = RelayFrame {
                    id: sender_id.to_string(),
                    kind,
                    description,
                };
                let json = match forwarded.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        debug!("relay frame from {} failed to serialize: {}", sender_id, e);
                        return;
                    }
                };
                if !self.registry.send_to(&target, json) {
                    debug!("no such peer {}, dropping relay from {}", target, sender_id);
                }
            }
        }
    }
}
