//! Beacon signaling protocol
//!
//! Wire types and session-code generation for the Beacon rendezvous relay.
//! Clients connect over WebSocket, receive a short numeric session code, and
//! exchange opaque negotiation payloads addressed by peer code.
//!
//! # Protocol
//!
//! 1. Client connects and receives `init` with its code and the peer list
//! 2. Existing peers receive an `update` with the refreshed peer list
//! 3. Clients relay offer/answer/candidate payloads addressed by peer code
//! 4. The server rewrites the envelope id to the sender's code and forwards
//! 5. On disconnect, remaining peers receive an `update`

pub mod code;
pub mod envelope;
pub mod error;

pub use code::generate_code;
pub use envelope::{ClientFrame, Envelope, PeerEntry, RelayFrame, ServerFrame};
pub use error::{CodeError, ProtocolError};

/// Default WebSocket port
pub const DEFAULT_PORT: u16 = 56565;

/// Keep-alive ping interval (must stay under the typical 30s idle timeout)
pub const KEEP_ALIVE_INTERVAL_SECS: u64 = 25;
