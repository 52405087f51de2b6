//! Beacon Signal Server
//!
//! Rendezvous relay for peers that cannot address each other directly.
//! Each WebSocket connection is assigned a 6-digit session code; clients
//! exchange opaque offer/answer/candidate payloads addressed by code, and
//! the server keeps everyone's peer list current with presence broadcasts.
//!
//! The server never interprets negotiation payloads. It rewrites the
//! envelope id from the target's code to the sender's code and forwards;
//! that is the whole relay contract.

pub mod broadcast;
pub mod connection;
pub mod registry;
pub mod router;
pub mod server;

pub use broadcast::PresenceBroadcaster;
pub use registry::{ConnectionHandle, SessionRegistry};
pub use router::MessageRouter;
pub use server::SignalServer;
