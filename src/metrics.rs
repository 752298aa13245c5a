//! Prometheus metrics for duetd.
//!
//! Tracks connection churn, pairing activity, relay throughput, and
//! handler errors. Exposed on the status HTTP endpoint as `/metrics`.

use crate::state::StatsSnapshot;
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

/// Total WebSocket connections accepted.
pub static CONNECTIONS_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Pairings made, labeled fresh vs. reconnection.
pub static MATCHES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Relayed frames by message type.
pub static RELAYED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Rejected inbound messages by error code.
pub static HANDLER_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Stale entries removed by the cleanup sweep.
pub static SWEEP_REMOVALS_TOTAL: OnceLock<IntCounter> = OnceLock::new();

/// Currently open WebSocket connections.
pub static CONNECTED: OnceLock<IntGauge> = OnceLock::new();

/// Registered users currently known to the lobby.
pub static REGISTERED: OnceLock<IntGauge> = OnceLock::new();

/// Users in the waiting pool.
pub static WAITING: OnceLock<IntGauge> = OnceLock::new();

/// Active 1:1 matches.
pub static ACTIVE_MATCHES: OnceLock<IntGauge> = OnceLock::new();

/// Initialize the metrics registry.
///
/// Must be called once at server startup before any metrics are recorded;
/// recording before init is a silent no-op.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(
        CONNECTIONS_TOTAL,
        IntCounter::new("duetd_connections_total", "WebSocket connections accepted")
    );
    register!(
        MATCHES_TOTAL,
        IntCounterVec::new(
            Opts::new("duetd_matches_total", "Pairings made"),
            &["kind"]
        )
    );
    register!(
        RELAYED_TOTAL,
        IntCounterVec::new(
            Opts::new("duetd_relayed_total", "Relayed frames by type"),
            &["kind"]
        )
    );
    register!(
        HANDLER_ERRORS_TOTAL,
        IntCounterVec::new(
            Opts::new("duetd_handler_errors_total", "Rejected inbound messages"),
            &["error"]
        )
    );
    register!(
        SWEEP_REMOVALS_TOTAL,
        IntCounter::new(
            "duetd_sweep_removals_total",
            "Stale entries removed by the cleanup sweep"
        )
    );
    register!(
        CONNECTED,
        IntGauge::new("duetd_connected", "Open WebSocket connections")
    );
    register!(
        REGISTERED,
        IntGauge::new("duetd_registered_users", "Registered users in the lobby")
    );
    register!(
        WAITING,
        IntGauge::new("duetd_waiting_users", "Users in the waiting pool")
    );
    register!(
        ACTIVE_MATCHES,
        IntGauge::new("duetd_active_matches", "Active 1:1 matches")
    );
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

#[inline]
pub fn inc_connections() {
    if let Some(c) = CONNECTIONS_TOTAL.get() {
        c.inc();
    }
}

#[inline]
pub fn inc_matches(is_reconnection: bool) {
    if let Some(c) = MATCHES_TOTAL.get() {
        let kind = if is_reconnection { "reconnection" } else { "fresh" };
        c.with_label_values(&[kind]).inc();
    }
}

#[inline]
pub fn inc_relayed(kind: &str) {
    if let Some(c) = RELAYED_TOTAL.get() {
        c.with_label_values(&[kind]).inc();
    }
}

#[inline]
pub fn inc_handler_errors(error: &str) {
    if let Some(c) = HANDLER_ERRORS_TOTAL.get() {
        c.with_label_values(&[error]).inc();
    }
}

#[inline]
pub fn inc_sweep_removals(removed: usize) {
    if let Some(c) = SWEEP_REMOVALS_TOTAL.get() {
        c.inc_by(removed as u64);
    }
}

#[inline]
pub fn set_connected(count: usize) {
    if let Some(g) = CONNECTED.get() {
        g.set(count as i64);
    }
}

/// Update the lobby gauges from a stats snapshot.
#[inline]
pub fn set_lobby_gauges(snapshot: &StatsSnapshot) {
    if let Some(g) = REGISTERED.get() {
        g.set(snapshot.total as i64);
    }
    if let Some(g) = WAITING.get() {
        g.set(snapshot.waiting_queue as i64);
    }
    if let Some(g) = ACTIVE_MATCHES.get() {
        g.set(snapshot.active_matches as i64);
    }
}
