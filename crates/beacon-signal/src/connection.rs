//! Per-connection lifecycle
//!
//! One task per WebSocket connection: register (code assigned, init queued,
//! join broadcast fired), then a select loop multiplexing the keep-alive
//! interval, the session's outbound queue, and inbound frames. Close and
//! transport error funnel into the same teardown; the keep-alive interval
//! is owned by this task and ends with it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error};

use beacon_core::KEEP_ALIVE_INTERVAL_SECS;

use crate::registry::SessionRegistry;
use crate::router::MessageRouter;

/// Drive one WebSocket connection from accept to teardown
pub async fn run_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<SessionRegistry>,
    router: Arc<MessageRouter>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (handle, mut outbound) = mpsc::unbounded_channel();
    let session_id = match registry.register(handle) {
        Ok(id) => id,
        Err(e) => {
            // Registration is the only fatal path for a fresh connection;
            // the client just sees the socket close.
            error!("rejecting {}: {}", peer_addr, e);
            let _ = ws_sender.close().await;
            return Ok(());
        }
    };
    debug!("new connection from {} as {}", peer_addr, session_id);

    router.broadcaster().announce_join(&session_id);

    let mut keep_alive =
        tokio::time::interval(Duration::from_secs(KEEP_ALIVE_INTERVAL_SECS));
    keep_alive.reset(); // skip the immediate first tick

    loop {
        tokio::select! {
            _ = keep_alive.tick() => {
                // Liveness probe only; a missed pong triggers nothing.
                if ws_sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            maybe_frame = outbound.recv() => {
                match maybe_frame {
                    Some(frame) => {
                        if ws_sender.send(frame).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            maybe_msg = ws_receiver.next() => {
                let Some(msg) = maybe_msg else { break };
                match msg {
                    Ok(Message::Text(text)) => router.handle_frame(&session_id, &text),
                    Ok(Message::Ping(data)) => {
                        debug!("ping from {}", session_id);
                        if ws_sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Pong(_)) => debug!("pong from {}", session_id),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("websocket error from {}: {:?}", session_id, e);
                        break;
                    }
                }
            }
        }
    }

    // Identical cleanup for clean close and transport error: deregister,
    // then tell the remaining peers.
    registry.remove(&session_id);
    router.broadcaster().broadcast(None);
    debug!("connection closed: {}", session_id);
    Ok(())
}
