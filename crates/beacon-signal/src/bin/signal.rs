//! Beacon Signal Server
//!
//! Rendezvous relay for peer-to-peer signaling. Clients connect over
//! WebSocket, receive a 6-digit session code, and exchange opaque
//! negotiation payloads addressed by peer code.
//!
//! # Usage
//!
//! ```bash
//! beacon-signal --port 56565
//! ```

use std::net::SocketAddr;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use beacon_core::DEFAULT_PORT;
use beacon_signal::SignalServer;

#[derive(Parser, Debug)]
#[command(name = "beacon-signal")]
#[command(about = "Beacon rendezvous relay for peer-to-peer signaling")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;

    info!("starting Beacon signal server");

    let server = SignalServer::new();
    server.serve(addr).await?;

    Ok(())
}
