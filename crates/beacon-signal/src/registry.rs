//! Session registry
//!
//! Single source of truth for who is online. All mutation happens behind
//! one mutex so presence snapshots always see a consistent view; per-key
//! locking would let a snapshot interleave with a concurrent join.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use beacon_core::code::generate_code;
use beacon_core::error::CodeError;
use beacon_core::PeerEntry;

/// Outbound side of a connection; the session exclusively owns it.
/// Sends are fire-and-forget: a closed receiver means the connection is
/// already tearing down and the frame is simply lost.
pub type ConnectionHandle = UnboundedSender<Message>;

/// One registered connection
struct Session {
    nickname: String,
    handle: ConnectionHandle,
}

/// A consistent copy of one registry row, taken under the lock
pub struct RosterEntry {
    pub id: String,
    pub nickname: String,
    pub handle: ConnectionHandle,
}

/// Code-keyed session map
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a session code and register the connection under it.
    ///
    /// The code allocation and the insert happen under one lock so two
    /// concurrent registrations can never race into the same code.
    pub fn register(&self, handle: ConnectionHandle) -> Result<String, CodeError> {
        let mut sessions = self.sessions.lock();
        let id = generate_code(|candidate| sessions.contains_key(candidate))?;
        sessions.insert(
            id.clone(),
            Session {
                nickname: String::new(),
                handle,
            },
        );
        Ok(id)
    }

    /// Overwrite a session's nickname. Returns false if the id is not live.
    pub fn set_nickname(&self, id: &str, nickname: &str) -> bool {
        match self.sessions.lock().get_mut(id) {
            Some(session) => {
                session.nickname = nickname.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove a session; idempotent if the id is already gone.
    pub fn remove(&self, id: &str) {
        self.sessions.lock().remove(id);
    }

    /// Whether the id names a live session
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.lock().contains_key(id)
    }

    /// All live sessions except `exclude`, in map order (not significant)
    pub fn snapshot(&self, exclude: &str) -> Vec<PeerEntry> {
        self.sessions
            .lock()
            .iter()
            .filter(|(id, _)| id.as_str() != exclude)
            .map(|(id, session)| PeerEntry {
                id: id.clone(),
                nickname: session.nickname.clone(),
            })
            .collect()
    }

    /// Send a text frame to a session. Returns false when the target is not
    /// live; that is "peer not found", not an error.
    pub fn send_to(&self, id: &str, text: String) -> bool {
        match self.sessions.lock().get(id) {
            Some(session) => {
                if session.handle.send(Message::Text(text)).is_err() {
                    debug!("send to {} raced its teardown", id);
                }
                true
            }
            None => false,
        }
    }

    /// One-lock copy of every live session, for presence fan-out
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.sessions
            .lock()
            .iter()
            .map(|(id, session)| RosterEntry {
                id: id.clone(),
                nickname: session.nickname.clone(),
                handle: session.handle.clone(),
            })
            .collect()
    }

    /// Live session count (for monitoring)
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
