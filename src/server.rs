//! Server assembly: wires the coordinator, gateway, status endpoint, and
//! periodic tickers together.
//!
//! Kept separate from `main` so integration tests can run a whole server
//! in-process on an ephemeral port.

use crate::config::Config;
use crate::coordinator::{Coordinator, Event};
use crate::http;
use crate::network::Gateway;
use crate::state::{Lobby, StatsSnapshot};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

/// Handle to a running server.
pub struct Server {
    /// Actual WebSocket listen address.
    pub addr: SocketAddr,
    /// Coordinator inbox; sending [`Event::Shutdown`] stops the event loop.
    pub events: mpsc::UnboundedSender<Event>,
    /// Live stats, as published by the coordinator.
    pub stats: watch::Receiver<StatsSnapshot>,
}

/// Start all server tasks. Returns once the listener is bound.
pub async fn start(config: Config) -> anyhow::Result<Server> {
    let started = Instant::now();
    crate::metrics::init();

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (stats_tx, stats_rx) = watch::channel(StatsSnapshot::default());

    let lobby = Lobby::new(config.matchmaking.timing(), events_tx.clone(), stats_tx);
    tokio::spawn(Coordinator::new(lobby, events_rx).run());

    let gateway = Gateway::bind(
        config.listen.address,
        config.listen.allow_origins.clone(),
        events_tx.clone(),
    )
    .await?;
    let addr = gateway.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = gateway.run().await {
            error!(error = %e, "Gateway stopped");
        }
    });

    // Convention: status_port = 0 disables the HTTP endpoint (used by tests).
    if config.server.status_port == 0 {
        info!("Status endpoint disabled");
    } else {
        tokio::spawn(http::run_http_server(
            config.server.status_port,
            stats_rx.clone(),
            started,
        ));
        info!(port = config.server.status_port, "Status HTTP server started");
    }

    spawn_ticker(events_tx.clone(), config.sweep.interval(), || Event::Sweep);
    spawn_ticker(events_tx.clone(), config.sweep.stats_interval(), || {
        Event::LogStats
    });

    info!(%addr, server = %config.server.name, "Server started");
    Ok(Server {
        addr,
        events: events_tx,
        stats: stats_rx,
    })
}

/// Send an event into the coordinator on a fixed period, stopping when the
/// coordinator goes away.
fn spawn_ticker(
    events: mpsc::UnboundedSender<Event>,
    period: Duration,
    make: impl Fn() -> Event + Send + 'static,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick fires immediately; skip it.
        interval.tick().await;
        loop {
            interval.tick().await;
            if events.send(make()).is_err() {
                break;
            }
        }
    });
}
