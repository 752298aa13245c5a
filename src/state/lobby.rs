//! The Lobby — central owned state for the signaling server.
//!
//! One Lobby is constructed per process and owned exclusively by the
//! coordinator task; nothing else touches the four core tables. Anything
//! that needs a reading view gets it through the stats watch channel.

use crate::coordinator::Event;
use crate::protocol::ServerMessage;
use crate::state::{
    ActiveMatches, ConnId, ConnectionRegistry, Identity, PairingHistory, Status, WaitingPool,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// Aggregate counts published to clients (`user-stats`), the status
/// endpoint, and the metrics gauges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total: usize,
    pub available: usize,
    pub waiting: usize,
    pub in_call: usize,
    pub waiting_queue: usize,
    pub active_matches: usize,
}

/// Delays applied when re-queuing the surviving side of an ended match.
#[derive(Debug, Clone, Copy)]
pub struct MatchTiming {
    /// Settle delay before the partner re-enters the waiting pool.
    pub settle_delay: Duration,
    /// Further delay before a match attempt is made for it.
    pub rematch_delay: Duration,
}

/// Central state container.
pub struct Lobby {
    pub registry: ConnectionRegistry,
    pub pool: WaitingPool,
    pub matches: ActiveMatches,
    pub history: PairingHistory,

    /// Identities ever minted, so a returning session token is
    /// recognized even if its owner never got paired. Never pruned,
    /// like the history.
    identities: HashSet<Identity>,

    /// Outbound queue per connection. A closed sender is how the Lobby
    /// observes that a transport has died.
    senders: HashMap<ConnId, mpsc::UnboundedSender<ServerMessage>>,

    /// Pending delayed re-queue/re-match tasks, cancellable per handle.
    pending: HashMap<ConnId, JoinHandle<()>>,

    /// Inbox of the coordinator that owns this Lobby; delayed tasks feed
    /// their events back through it.
    events: mpsc::UnboundedSender<Event>,

    stats_tx: watch::Sender<StatsSnapshot>,
    pub timing: MatchTiming,
}

impl Lobby {
    pub fn new(
        timing: MatchTiming,
        events: mpsc::UnboundedSender<Event>,
        stats_tx: watch::Sender<StatsSnapshot>,
    ) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            pool: WaitingPool::new(),
            matches: ActiveMatches::new(),
            history: PairingHistory::new(),
            identities: HashSet::new(),
            senders: HashMap::new(),
            pending: HashMap::new(),
            events,
            stats_tx,
            timing,
        }
    }

    // ------------------------------------------------------------------
    // Transport senders
    // ------------------------------------------------------------------

    /// Attach the outbound queue of a newly accepted connection.
    pub fn attach(&mut self, conn: ConnId, tx: mpsc::UnboundedSender<ServerMessage>) {
        self.senders.insert(conn, tx);
    }

    pub fn detach(&mut self, conn: ConnId) {
        self.senders.remove(&conn);
    }

    /// Is the transport for this handle still usable?
    pub fn is_open(&self, conn: ConnId) -> bool {
        self.senders.get(&conn).is_some_and(|tx| !tx.is_closed())
    }

    /// Queue a message for one connection. Returns false if the transport
    /// is missing or closed.
    pub fn send_to(&self, conn: ConnId, msg: ServerMessage) -> bool {
        match self.senders.get(&conn) {
            Some(tx) => tx.send(msg).is_ok(),
            None => false,
        }
    }

    /// Queue a message for every open connection.
    pub fn broadcast(&self, msg: &ServerMessage) {
        for tx in self.senders.values() {
            let _ = tx.send(msg.clone());
        }
    }

    pub fn connection_count(&self) -> usize {
        self.senders.len()
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Resolve the identity for a `find-partner` request.
    ///
    /// A known session token wins; otherwise an existing registration on
    /// the same connection keeps its identity; otherwise a fresh one is
    /// minted. Absent, malformed, and unknown tokens all fall through the
    /// same way. Returns the identity and whether it was newly minted.
    pub fn resolve_identity(&mut self, conn: ConnId, token: Option<&str>) -> (Identity, bool) {
        if let Some(token) = token
            && let Some(id) = Identity::parse(token)
            && self.identities.contains(&id)
        {
            return (id, false);
        }
        if let Some(user) = self.registry.lookup(conn) {
            return (user.identity, false);
        }
        let id = Identity::mint();
        self.identities.insert(id);
        (id, true)
    }

    // ------------------------------------------------------------------
    // Status + stats
    // ------------------------------------------------------------------

    /// Record a status transition for a handle.
    ///
    /// Moving to in-call removes the handle from the waiting pool, and
    /// every actual change triggers a stats notification.
    pub fn set_status(&mut self, conn: ConnId, status: Status) {
        let Some(old) = self.registry.set_status(conn, status) else {
            return;
        };
        if status == Status::InCall {
            self.pool.remove(conn);
        }
        if old != status {
            debug!(%conn, from = %old, to = %status, "Status transition");
            self.broadcast_stats();
        }
    }

    /// Current aggregate counts.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total: self.registry.len(),
            available: self.registry.count_status(Status::Available),
            waiting: self.registry.count_status(Status::Waiting),
            in_call: self.registry.count_status(Status::InCall),
            waiting_queue: self.pool.len(),
            active_matches: self.matches.len(),
        }
    }

    /// Publish the current snapshot to the watch channel, the metrics
    /// gauges, and all connected clients.
    pub fn broadcast_stats(&self) {
        let snapshot = self.snapshot();
        self.stats_tx.send_replace(snapshot);
        crate::metrics::set_lobby_gauges(&snapshot);
        self.broadcast(&ServerMessage::UserStats {
            total: snapshot.total,
            available: snapshot.available,
            waiting: snapshot.waiting,
            in_call: snapshot.in_call,
            waiting_queue: snapshot.waiting_queue,
            active_matches: snapshot.active_matches,
        });
    }

    /// Tell everyone how many sockets are connected.
    pub fn broadcast_user_count(&self) {
        self.broadcast(&ServerMessage::UserCount {
            count: self.connection_count(),
        });
    }

    // ------------------------------------------------------------------
    // Delayed actions
    // ------------------------------------------------------------------

    /// Schedule `event` to re-enter the coordinator after `delay`,
    /// replacing (and cancelling) any action already pending for this
    /// handle. The fired event re-validates state on arrival, so a
    /// cancelled-but-already-fired task is still harmless.
    pub fn schedule(&mut self, conn: ConnId, delay: Duration, event: Event) {
        self.cancel_pending(conn);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event);
        });
        self.pending.insert(conn, handle);
    }

    /// Abort any delayed action pending for this handle.
    pub fn cancel_pending(&mut self, conn: ConnId) {
        if let Some(handle) = self.pending.remove(&conn) {
            handle.abort();
        }
    }

    /// Drop the bookkeeping entry for a pending task that just fired.
    pub fn clear_pending(&mut self, conn: ConnId) {
        self.pending.remove(&conn);
    }

    #[cfg(test)]
    pub fn has_pending(&self, conn: ConnId) -> bool {
        self.pending.contains_key(&conn)
    }
}
