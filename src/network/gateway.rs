//! Gateway - WebSocket listener that accepts incoming connections.
//!
//! The Gateway binds one TCP socket, performs the WebSocket handshake with
//! an Origin check, and spawns a Connection task per client. It never
//! touches lobby state; everything it learns goes to the coordinator as
//! events.

use crate::coordinator::Event;
use crate::network::Connection;
use crate::state::ConnIdGenerator;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tracing::{error, info, instrument, warn};

/// The Gateway accepts incoming connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    allow_origins: Vec<String>,
    events: mpsc::UnboundedSender<Event>,
    ids: ConnIdGenerator,
}

impl Gateway {
    /// Bind the gateway to the specified address.
    pub async fn bind(
        addr: SocketAddr,
        allow_origins: Vec<String>,
        events: mpsc::UnboundedSender<Event>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "WebSocket listener bound");
        Ok(Self {
            listener,
            allow_origins,
            events,
            ids: ConnIdGenerator::new(),
        })
    }

    /// The bound address. Differs from the configured one when binding to
    /// port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the gateway, accepting connections forever.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let conn = self.ids.next();
                    let events = self.events.clone();
                    let allowed = self.allow_origins.clone();

                    tokio::spawn(async move {
                        // Origin validation callback for the handshake.
                        let cors_callback =
                            |req: &http::Request<()>, response: http::Response<()>| {
                                // An empty allow list allows all origins.
                                if allowed.is_empty() {
                                    return Ok(response);
                                }
                                if let Some(origin) = req
                                    .headers()
                                    .get("Origin")
                                    .and_then(|o| o.to_str().ok())
                                {
                                    if allowed.iter().any(|a| a == origin || a == "*") {
                                        return Ok(response);
                                    }
                                    warn!(%addr, origin = %origin, "WebSocket CORS rejected");
                                }
                                Err(http::Response::builder()
                                    .status(http::StatusCode::FORBIDDEN)
                                    .body(Some("CORS origin not allowed".to_string()))
                                    .unwrap())
                            };

                        match accept_hdr_async(stream, cors_callback).await {
                            Ok(ws_stream) => {
                                info!(%conn, %addr, "WebSocket handshake successful");
                                Connection::new(conn, addr, events).run(ws_stream).await;
                                info!(%conn, %addr, "WebSocket connection closed");
                            }
                            Err(e) => {
                                warn!(%addr, error = %e, "WebSocket handshake failed");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}
