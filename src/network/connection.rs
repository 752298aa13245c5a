//! Connection - handles an individual WebSocket client.
//!
//! Each connection runs in its own Tokio task and owns nothing but its
//! socket halves and the receiving end of its outbound queue. Decoded
//! frames go to the coordinator as events; frames queued by the
//! coordinator come back through the channel and are written here. When
//! the task exits for any reason the queue receiver drops, which is how
//! the rest of the server learns the transport is dead.

use crate::coordinator::Event;
use crate::error::HandlerError;
use crate::protocol;
use crate::state::ConnId;
use futures_util::{Sink, SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, instrument, warn};

/// A client connection handler.
pub struct Connection {
    conn: ConnId,
    addr: SocketAddr,
    events: mpsc::UnboundedSender<Event>,
}

impl Connection {
    pub fn new(conn: ConnId, addr: SocketAddr, events: mpsc::UnboundedSender<Event>) -> Self {
        Self { conn, addr, events }
    }

    /// Run the connection loop until the socket closes or the coordinator
    /// drops us.
    #[instrument(skip_all, fields(conn = %self.conn, addr = %self.addr), name = "connection")]
    pub async fn run(self, ws_stream: WebSocketStream<TcpStream>) {
        let (mut sink, mut stream) = ws_stream.split();
        let (tx, mut outbound) = mpsc::unbounded_channel();

        if self
            .events
            .send(Event::Connected {
                conn: self.conn,
                sender: tx,
            })
            .is_err()
        {
            // Coordinator already gone; nothing to serve.
            return;
        }

        loop {
            tokio::select! {
                queued = outbound.recv() => {
                    match queued {
                        Some(msg) => {
                            if let Err(e) = sink.send(Message::Text(msg.encode())).await {
                                debug!(error = %e, "Write failed");
                                break;
                            }
                        }
                        // Coordinator detached this connection.
                        None => break,
                    }
                }
                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if !self.handle_text(&text, &mut sink).await {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {
                            // Binary, ping, pong: nothing to do. Tungstenite
                            // answers pings on its own.
                        }
                        Some(Err(e)) => {
                            debug!(error = %e, "Read failed");
                            break;
                        }
                    }
                }
            }
        }

        let _ = self.events.send(Event::Closed { conn: self.conn });
    }

    /// Decode one text frame and forward it. Returns false when the
    /// coordinator is gone and the loop should end.
    async fn handle_text(
        &self,
        text: &str,
        sink: &mut (impl Sink<Message> + Unpin),
    ) -> bool {
        match protocol::parse_client(text) {
            Ok(Some(msg)) => self
                .events
                .send(Event::Inbound {
                    conn: self.conn,
                    msg,
                })
                .is_ok(),
            Ok(None) => {
                debug!("Unknown message type ignored");
                true
            }
            Err(e) => {
                // Malformed frames are answered here; the coordinator
                // never sees them.
                warn!(error = %e, "Undecodable frame");
                let err = HandlerError::Malformed(e);
                crate::metrics::inc_handler_errors(err.error_code());
                if let Some(reply) = err.to_reply() {
                    let _ = sink.send(Message::Text(reply.encode())).await;
                }
                true
            }
        }
    }
}
