//! WebSocket signal server implementation

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::connection::run_connection;
use crate::registry::SessionRegistry;
use crate::router::MessageRouter;

/// Signal server state
pub struct SignalServer {
    registry: Arc<SessionRegistry>,
    router: Arc<MessageRouter>,
}

impl SignalServer {
    pub fn new() -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let router = Arc::new(MessageRouter::new(registry.clone()));
        Self { registry, router }
    }

    /// Bind and run the accept loop
    pub async fn serve(&self, addr: SocketAddr) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        info!("signal server listening on {}", addr);
        self.serve_on(listener).await
    }

    /// Run the accept loop on an already-bound listener
    pub async fn serve_on(&self, listener: TcpListener) -> Result<(), std::io::Error> {
        loop {
            let (stream, peer_addr) = listener.accept().await?;
            let registry = self.registry.clone();
            let router = self.router.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, registry, router).await {
                    debug!("connection error from {}: {:?}", peer_addr, e);
                }
            });
        }
    }

    /// Get live session count (for monitoring)
    pub fn peer_count(&self) -> usize {
        self.registry.len()
    }
}

impl Default for SignalServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle a single connection (HTTP probe or WebSocket)
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<SessionRegistry>,
    router: Arc<MessageRouter>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Peek at the first bytes to detect plain HTTP vs WebSocket upgrade
    let mut peek_buf = [0u8; 4];
    stream.peek(&mut peek_buf).await?;

    if &peek_buf == b"GET " && !is_websocket_upgrade(&stream).await? {
        return handle_http_request(&mut stream, registry.len()).await;
    }

    run_connection(stream, peer_addr, registry, router).await
}

/// Upper bound on the request head considered for classification
const MAX_HEAD_BYTES: usize = 4096;

/// Peek the request head and look for the upgrade header.
///
/// The handshake may arrive fragmented, so the peek is retried until the
/// header block terminator shows up, the head outgrows the bound, or the
/// peer stops sending.
async fn is_websocket_upgrade(stream: &TcpStream) -> Result<bool, std::io::Error> {
    let mut buf = vec![0u8; MAX_HEAD_BYTES];
    let mut head_len = 0;
    let mut stalls = 0;

    loop {
        let n = stream.peek(&mut buf).await?;
        if buf[..n].windows(4).any(|w| w == b"\r\n\r\n") || n == buf.len() {
            head_len = n;
            break;
        }
        if n == head_len {
            stalls += 1;
            if stalls > 100 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        } else {
            stalls = 0;
            head_len = n;
        }
    }

    let head = String::from_utf8_lossy(&buf[..head_len]).to_ascii_lowercase();
    Ok(head.contains("upgrade: websocket"))
}

/// Handle a plain HTTP request (health checks)
async fn handle_http_request(
    stream: &mut TcpStream,
    peer_count: usize,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut buf = vec![0u8; 1024];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");

    let (status, body) = match path {
        "/health" => (
            "200 OK",
            format!(r#"{{"status":"healthy","peers":{}}}"#, peer_count),
        ),
        "/stats" => ("200 OK", format!(r#"{{"peers":{}}}"#, peer_count)),
        _ => ("404 Not Found", r#"{"error":"not found"}"#.to_string()),
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );

    stream.write_all(response.as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

    async fn start_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let server = SignalServer::new();
            let _ = server.serve_on(listener).await;
        });
        addr
    }

    async fn connect(addr: SocketAddr) -> Client {
        let url = format!("ws://{}/signaling", addr);
        let (client, _) = connect_async(url).await.unwrap();
        client
    }

    async fn recv_json(client: &mut Client) -> serde_json::Value {
        let msg = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        match msg {
            Message::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    #[test]
    fn test_server_creation() {
        let server = SignalServer::new();
        assert_eq!(server.peer_count(), 0);
    }

    #[tokio::test]
    async fn test_join_relay_and_departure_flow() {
        let addr = start_server().await;

        // A connects and is alone
        let mut a = connect(addr).await;
        let init_a = recv_json(&mut a).await;
        assert_eq!(init_a["type"], "init");
        let a_id = init_a["id"].as_str().unwrap().to_string();
        assert_eq!(init_a["ids"].as_array().unwrap().len(), 0);

        // B connects; B sees A in init, A learns of B via update
        let mut b = connect(addr).await;
        let init_b = recv_json(&mut b).await;
        assert_eq!(init_b["type"], "init");
        let b_id = init_b["id"].as_str().unwrap().to_string();
        assert_eq!(init_b["ids"][0]["id"], a_id.as_str());

        let update_a = recv_json(&mut a).await;
        assert_eq!(update_a["type"], "update");
        assert_eq!(update_a["ids"][0]["id"], b_id.as_str());

        // B relays an offer to A; A sees it with the sender's id
        let offer = format!(
            r#"{{"id":"{a_id}","type":"offer","description":"sdp-payload"}}"#
        );
        b.send(Message::Text(offer)).await.unwrap();

        let relayed = recv_json(&mut a).await;
        assert_eq!(relayed["id"], b_id.as_str());
        assert_eq!(relayed["type"], "offer");
        assert_eq!(relayed["description"], "sdp-payload");

        // B leaves; A's peer list empties
        b.close(None).await.unwrap();
        let update_a = recv_json(&mut a).await;
        assert_eq!(update_a["type"], "update");
        assert_eq!(update_a["ids"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_abrupt_disconnect_broadcasts_departure() {
        let addr = start_server().await;

        let mut a = connect(addr).await;
        let _ = recv_json(&mut a).await;

        let b = connect(addr).await;
        let _ = recv_json(&mut a).await; // join update

        // Drop the socket without a Close handshake; the transport error
        // path must run the same cleanup as a graceful close.
        drop(b);

        let update_a = recv_json(&mut a).await;
        assert_eq!(update_a["type"], "update");
        assert_eq!(update_a["ids"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_nickname_propagates() {
        let addr = start_server().await;

        let mut a = connect(addr).await;
        let _ = recv_json(&mut a).await;

        let mut b = connect(addr).await;
        let init_b = recv_json(&mut b).await;
        let b_id = init_b["id"].as_str().unwrap().to_string();
        let _ = recv_json(&mut a).await; // join update

        b.send(Message::Text(
            r#"{"type":"update_nickname","description":"bob"}"#.into(),
        ))
        .await
        .unwrap();

        let update_a = recv_json(&mut a).await;
        assert_eq!(update_a["type"], "update");
        assert_eq!(update_a["ids"][0]["id"], b_id.as_str());
        assert_eq!(update_a["ids"][0]["nickname"], "bob");
    }

    #[tokio::test]
    async fn test_malformed_frame_does_not_kill_connection() {
        let addr = start_server().await;

        let mut a = connect(addr).await;
        let init_a = recv_json(&mut a).await;
        let a_id = init_a["id"].as_str().unwrap().to_string();

        let mut b = connect(addr).await;
        let _ = recv_json(&mut b).await;
        let _ = recv_json(&mut a).await;

        b.send(Message::Text("{not json".into())).await.unwrap();
        // Connection survives: a well-formed relay still goes through
        let offer = format!(r#"{{"id":"{a_id}","type":"offer","description":"x"}}"#);
        b.send(Message::Text(offer)).await.unwrap();

        let relayed = recv_json(&mut a).await;
        assert_eq!(relayed["type"], "offer");
    }

    #[tokio::test]
    async fn test_http_health_probe() {
        let addr = start_server().await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: beacon\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        let response = String::from_utf8_lossy(&response);
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains(r#""status":"healthy""#));
    }

    #[tokio::test]
    async fn test_fragmented_request_head_still_classified() {
        let addr = start_server().await;

        // Request line first, headers after a pause; the classifier must
        // wait for the terminator instead of judging the first fragment.
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET /health HTTP/1.1\r\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        stream
            .write_all(b"Host: beacon\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        let response = String::from_utf8_lossy(&response);
        assert!(response.starts_with("HTTP/1.1 200 OK"));
    }
}
