//! Presence broadcasting
//!
//! Pushes refreshed peer lists whenever the registry changes: a session
//! joins, changes nickname, or leaves. Every recipient gets its own
//! snapshot (the list never contains the recipient itself), all computed
//! from a single roster copy so one registry view backs the whole fan-out.

use std::sync::Arc;

use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use beacon_core::{PeerEntry, ServerFrame};

use crate::registry::{RosterEntry, SessionRegistry};

pub struct PresenceBroadcaster {
    registry: Arc<SessionRegistry>,
}

impl PresenceBroadcaster {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Welcome a newly registered session and tell everyone else about it.
    ///
    /// The entrant gets `init` (its code plus the prior peers); that frame
    /// is queued before the `update` fan-out so its snapshot and the
    /// existing peers' snapshots agree on who was there first.
    pub fn announce_join(&self, new_id: &str) {
        let roster = self.registry.roster();

        if let Some(entrant) = roster.iter().find(|entry| entry.id == new_id) {
            let init = ServerFrame::Init {
                id: new_id.to_string(),
                ids: peers_excluding(&roster, new_id),
            };
            send_frame(entrant, &init);
        }

        self.fan_out(&roster, Some(new_id));
    }

    /// Push `update` to every session except `exclude`
    pub fn broadcast(&self, exclude: Option<&str>) {
        let roster = self.registry.roster();
        self.fan_out(&roster, exclude);
    }

    fn fan_out(&self, roster: &[RosterEntry], exclude: Option<&str>) {
        for entry in roster {
            if Some(entry.id.as_str()) == exclude {
                continue;
            }
            let update = ServerFrame::Update {
                ids: peers_excluding(roster, &entry.id),
            };
            send_frame(entry, &update);
        }
    }
}

fn peers_excluding(roster: &[RosterEntry], exclude: &str) -> Vec<PeerEntry> {
    roster
        .iter()
        .filter(|entry| entry.id != exclude)
        .map(|entry| PeerEntry {
            id: entry.id.clone(),
            nickname: entry.nickname.clone(),
        })
        .collect()
}

fn send_frame(entry: &RosterEntry, frame: &ServerFrame) {
    let json = match frame.to_json() {
        Ok(json) => json,
        Err(e) => {
            warn!("presence frame failed to serialize: {}", e);
            return;
        }
    };
    if entry.handle.send(Message::Text(json)).is_err() {
        debug!("presence push to {} raced its teardown", entry.id);
    }
}
