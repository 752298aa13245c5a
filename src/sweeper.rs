//! Periodic cleanup of state orphaned by silent disconnects.
//!
//! The close path already tears most things down; the sweep is the
//! backstop for entries that slipped through (a transport that died
//! without a close event, a pool entry for a vanished registration).
//! Pairing history is deliberately never swept.

use crate::matchmaker;
use crate::state::{ConnId, Lobby};
use tracing::info;

/// What one sweep removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    /// Registry entries whose transport was dead.
    pub connections: usize,
    /// Waiting-pool entries with no usable registration behind them.
    pub waiting: usize,
    /// Matches torn down because one side was dead.
    pub matches: usize,
}

impl SweepSummary {
    pub fn removed(&self) -> usize {
        self.connections + self.waiting + self.matches
    }
}

/// Sweep all tables once.
///
/// A surviving partner of a swept match is notified and re-queued exactly
/// as if the dead side had disconnected cleanly.
pub fn sweep(lobby: &mut Lobby) -> SweepSummary {
    let mut summary = SweepSummary::default();

    let dead: Vec<ConnId> = lobby
        .registry
        .handles()
        .filter(|&conn| !lobby.is_open(conn))
        .collect();
    for &conn in &dead {
        if matchmaker::end_match(lobby, conn).is_some() {
            summary.matches += 1;
        }
        lobby.cancel_pending(conn);
        lobby.registry.remove(conn);
        lobby.detach(conn);
    }
    summary.connections = dead.len();

    // Matches must have both sides registered. The dead-transport pass
    // above covers the normal case; this catches an open transport whose
    // registration vanished.
    let broken: Vec<ConnId> = lobby
        .matches
        .iter_pairs()
        .filter_map(|(a, b)| {
            if !lobby.registry.contains(a) {
                Some(a)
            } else if !lobby.registry.contains(b) {
                Some(b)
            } else {
                None
            }
        })
        .collect();
    for conn in broken {
        if matchmaker::end_match(lobby, conn).is_some() {
            summary.matches += 1;
        }
    }

    // Pool entries must point at live registrations.
    let stale: Vec<ConnId> = lobby
        .pool
        .snapshot()
        .into_iter()
        .filter(|&conn| !lobby.registry.contains(conn) || !lobby.is_open(conn))
        .collect();
    for conn in &stale {
        lobby.pool.remove(*conn);
    }
    summary.waiting = stale.len();

    if summary.removed() > 0 {
        info!(
            connections = summary.connections,
            waiting = summary.waiting,
            matches = summary.matches,
            "Sweep removed stale entries"
        );
        crate::metrics::inc_sweep_removals(summary.removed());
        lobby.broadcast_user_count();
        lobby.broadcast_stats();
    }
    summary
}

/// Periodic operational stats line.
pub fn log_stats(lobby: &Lobby) {
    let snapshot = lobby.snapshot();
    info!(
        connections = lobby.connection_count(),
        registered = snapshot.total,
        available = snapshot.available,
        waiting = snapshot.waiting,
        in_call = snapshot.in_call,
        queue = snapshot.waiting_queue,
        matches = snapshot.active_matches,
        history_identities = lobby.history.identities(),
        history_entries = lobby.history.total_entries(),
        "Server stats"
    );
}
