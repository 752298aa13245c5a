//! Single-writer event loop that owns the Lobby.
//!
//! Connection tasks, timers, and tickers all funnel into one mpsc inbox;
//! the coordinator drains it and applies every state change sequentially.
//! That is the whole concurrency story: no locks, no partial updates, and
//! a total order over pairing decisions.

use crate::error::HandlerResult;
use crate::matchmaker;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::relay;
use crate::state::{ConnId, Lobby};
use crate::sweeper;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::ops::ControlFlow;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Everything that can happen to the Lobby.
#[derive(Debug)]
pub enum Event {
    /// A WebSocket finished its handshake.
    Connected {
        conn: ConnId,
        sender: mpsc::UnboundedSender<ServerMessage>,
    },
    /// A decoded frame arrived from a client.
    Inbound { conn: ConnId, msg: ClientMessage },
    /// The transport for a connection is gone.
    Closed { conn: ConnId },
    /// Delayed re-queue fired (settle delay elapsed).
    Requeue { conn: ConnId },
    /// Delayed match attempt fired (rematch delay elapsed).
    TryMatch { conn: ConnId },
    /// Periodic cleanup tick.
    Sweep,
    /// Periodic stats-log tick.
    LogStats,
    /// Server is going down; say goodbye and stop.
    Shutdown { message: String },
}

/// The event loop. Owns the Lobby and a seeded rng for partner selection.
pub struct Coordinator {
    lobby: Lobby,
    events: mpsc::UnboundedReceiver<Event>,
    rng: StdRng,
}

impl Coordinator {
    pub fn new(lobby: Lobby, events: mpsc::UnboundedReceiver<Event>) -> Self {
        Self {
            lobby,
            events,
            rng: StdRng::from_entropy(),
        }
    }

    /// Drain the inbox until shutdown or until every sender is gone.
    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            if self.handle_event(event).is_break() {
                break;
            }
        }
        info!("Coordinator stopped");
    }

    fn handle_event(&mut self, event: Event) -> ControlFlow<()> {
        match event {
            Event::Connected { conn, sender } => {
                self.lobby.attach(conn, sender);
                self.lobby.send_to(conn, ServerMessage::ConnectionEstablished {
                    message: "Connected to signaling server".to_string(),
                });
                self.lobby.broadcast_user_count();
                crate::metrics::inc_connections();
                crate::metrics::set_connected(self.lobby.connection_count());
                info!(%conn, total = self.lobby.connection_count(), "Connection opened");
            }
            Event::Inbound { conn, msg } => {
                let kind = msg.kind();
                if let Err(err) = self.dispatch(conn, msg) {
                    crate::metrics::inc_handler_errors(err.error_code());
                    warn!(%conn, kind, error = %err, "Handler rejected message");
                    if let Some(reply) = err.to_reply() {
                        self.lobby.send_to(conn, reply);
                    }
                }
            }
            Event::Closed { conn } => {
                matchmaker::end_match(&mut self.lobby, conn);
                self.lobby.pool.remove(conn);
                self.lobby.cancel_pending(conn);
                self.lobby.registry.remove(conn);
                self.lobby.detach(conn);
                self.lobby.broadcast_user_count();
                self.lobby.broadcast_stats();
                crate::metrics::set_connected(self.lobby.connection_count());
                info!(%conn, total = self.lobby.connection_count(), "Connection closed");
            }
            Event::Requeue { conn } => {
                matchmaker::handle_requeue(&mut self.lobby, conn);
            }
            Event::TryMatch { conn } => {
                matchmaker::handle_try_match(&mut self.lobby, conn, &mut self.rng);
            }
            Event::Sweep => {
                sweeper::sweep(&mut self.lobby);
            }
            Event::LogStats => {
                sweeper::log_stats(&self.lobby);
            }
            Event::Shutdown { message } => {
                self.lobby.broadcast(&ServerMessage::Error { message });
                info!("Shutdown requested, farewell sent");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn dispatch(&mut self, conn: ConnId, msg: ClientMessage) -> HandlerResult {
        match msg {
            ClientMessage::FindPartner { username, token } => matchmaker::find_partner(
                &mut self.lobby,
                conn,
                &username,
                token.as_deref(),
                &mut self.rng,
            ),
            ClientMessage::Offer { offer } => relay::relay_offer(&mut self.lobby, conn, offer),
            ClientMessage::Answer { answer } => relay::relay_answer(&mut self.lobby, conn, answer),
            ClientMessage::IceCandidate { candidate } => {
                relay::relay_ice(&mut self.lobby, conn, candidate)
            }
            ClientMessage::ChatMessage { message, sender } => {
                relay::relay_chat(&mut self.lobby, conn, &message, sender)
            }
            ClientMessage::CallStarted => {
                relay::call_started(&mut self.lobby, conn);
                Ok(())
            }
            ClientMessage::CallEnded => {
                relay::call_ended(&mut self.lobby, conn);
                Ok(())
            }
            ClientMessage::Disconnect => {
                matchmaker::disconnect_and_retry(&mut self.lobby, conn);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::conn::conn_for_test;
    use crate::state::{MatchTiming, StatsSnapshot};
    use std::time::Duration;
    use tokio::sync::watch;

    struct Harness {
        events: mpsc::UnboundedSender<Event>,
        task: tokio::task::JoinHandle<()>,
    }

    fn start() -> Harness {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (stats_tx, _stats_rx) = watch::channel(StatsSnapshot::default());
        let timing = MatchTiming {
            settle_delay: Duration::from_millis(5),
            rematch_delay: Duration::from_millis(5),
        };
        let lobby = Lobby::new(timing, events_tx.clone(), stats_tx);
        let coordinator = Coordinator::new(lobby, events_rx);
        Harness {
            events: events_tx,
            task: tokio::spawn(coordinator.run()),
        }
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for a server message")
            .expect("outbound channel closed")
    }

    fn connect(
        harness: &Harness,
        n: u64,
    ) -> (ConnId, mpsc::UnboundedReceiver<ServerMessage>) {
        let conn = conn_for_test(n);
        let (tx, rx) = mpsc::unbounded_channel();
        harness
            .events
            .send(Event::Connected { conn, sender: tx })
            .unwrap();
        (conn, rx)
    }

    #[tokio::test]
    async fn connect_greets_and_counts() {
        let harness = start();
        let (_a, mut rx) = connect(&harness, 1);
        assert!(matches!(
            recv(&mut rx).await,
            ServerMessage::ConnectionEstablished { .. }
        ));
        assert!(matches!(
            recv(&mut rx).await,
            ServerMessage::UserCount { count: 1 }
        ));
    }

    #[tokio::test]
    async fn full_pairing_through_the_event_loop() {
        let harness = start();
        let (a, mut rx_a) = connect(&harness, 1);
        let (b, mut rx_b) = connect(&harness, 2);

        harness
            .events
            .send(Event::Inbound {
                conn: a,
                msg: ClientMessage::FindPartner {
                    username: "Alice".to_string(),
                    token: None,
                },
            })
            .unwrap();
        harness
            .events
            .send(Event::Inbound {
                conn: b,
                msg: ClientMessage::FindPartner {
                    username: "Bob".to_string(),
                    token: None,
                },
            })
            .unwrap();

        // Alice: greeting, counts, session token, waiting ack, then the
        // pairing. Scan instead of pattern-matching a fixed sequence.
        let mut found = None;
        for _ in 0..16 {
            if let ServerMessage::PartnerFound { partner, .. } = recv(&mut rx_a).await {
                found = Some(partner);
                break;
            }
        }
        assert_eq!(found.as_deref(), Some("Bob"));

        let mut found = None;
        for _ in 0..16 {
            if let ServerMessage::PartnerFound { partner, .. } = recv(&mut rx_b).await {
                found = Some(partner);
                break;
            }
        }
        assert_eq!(found.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn handler_errors_become_error_frames() {
        let harness = start();
        let (a, mut rx_a) = connect(&harness, 1);
        harness
            .events
            .send(Event::Inbound {
                conn: a,
                msg: ClientMessage::FindPartner {
                    username: "x".to_string(),
                    token: None,
                },
            })
            .unwrap();

        let mut error = None;
        for _ in 0..8 {
            if let ServerMessage::Error { message } = recv(&mut rx_a).await {
                error = Some(message);
                break;
            }
        }
        assert!(error.unwrap().contains("2-20"));
    }

    #[tokio::test]
    async fn shutdown_sends_a_farewell_and_stops() {
        let harness = start();
        let (_a, mut rx_a) = connect(&harness, 1);
        harness
            .events
            .send(Event::Shutdown {
                message: "Server is shutting down".to_string(),
            })
            .unwrap();

        let mut farewell = None;
        for _ in 0..8 {
            if let ServerMessage::Error { message } = recv(&mut rx_a).await {
                farewell = Some(message);
                break;
            }
        }
        assert!(farewell.unwrap().contains("shutting down"));
        harness.task.await.unwrap();
    }
}
