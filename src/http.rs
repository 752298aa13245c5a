//! HTTP server for the status and Prometheus metrics endpoints.
//!
//! Runs on a separate tokio task. `/status` serves a JSON health summary
//! fed by the coordinator's stats watch channel; `/metrics` serves the
//! Prometheus text format.

use crate::state::StatsSnapshot;
use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::watch;

#[derive(Clone)]
struct StatusState {
    stats: watch::Receiver<StatsSnapshot>,
    started: Instant,
}

async fn status_handler(State(state): State<StatusState>) -> Json<Value> {
    let snapshot = *state.stats.borrow();
    Json(json!({
        "status": "ok",
        "totalConnections": snapshot.total,
        "availableUsers": snapshot.available,
        "waitingUsers": snapshot.waiting,
        "usersInCall": snapshot.in_call,
        "waitingQueue": snapshot.waiting_queue,
        "activeMatches": snapshot.active_matches,
        "uptimeSeconds": state.started.elapsed().as_secs(),
    }))
}

async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

/// Run the status HTTP server.
///
/// Binds to `0.0.0.0:port` and serves `/status` and `/metrics`. This is a
/// long-running task that should be spawned in the background. `started`
/// is the server's start instant, so `uptimeSeconds` reports server
/// uptime rather than the age of this task.
pub async fn run_http_server(port: u16, stats: watch::Receiver<StatsSnapshot>, started: Instant) {
    let state = StatusState { stats, started };
    let app = Router::new()
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Status HTTP server listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind HTTP server on {}: {}", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("HTTP server error: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn status_reports_uptime_from_the_given_start() {
        let (_tx, stats) = watch::channel(StatsSnapshot::default());
        let state = StatusState {
            stats,
            started: Instant::now() - Duration::from_secs(42),
        };
        let Json(body) = status_handler(State(state)).await;
        assert!(body["uptimeSeconds"].as_u64().unwrap() >= 42);
        assert_eq!(body["status"], "ok");
    }
}
