//! WaitingPool — ordered set of handles seeking a partner.

use crate::state::ConnId;

/// Handles currently waiting for a match, in arrival order, no duplicates.
///
/// Invariant (enforced by the Lobby, checked by the sweeper): a handle in
/// the pool is never a key of the active-match table and never has status
/// in-call.
#[derive(Default)]
pub struct WaitingPool {
    queue: Vec<ConnId>,
}

impl WaitingPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handle. Idempotent — a handle already present keeps its
    /// original position.
    pub fn enqueue(&mut self, conn: ConnId) {
        if !self.queue.contains(&conn) {
            self.queue.push(conn);
        }
    }

    /// Remove a handle if present. Returns whether it was there.
    pub fn remove(&mut self, conn: ConnId) -> bool {
        if let Some(pos) = self.queue.iter().position(|&c| c == conn) {
            self.queue.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, conn: ConnId) -> bool {
        self.queue.contains(&conn)
    }

    /// Copy of the current queue, for candidate filtering during matching.
    pub fn snapshot(&self) -> Vec<ConnId> {
        self.queue.clone()
    }

    /// Retain only handles the predicate accepts; returns how many were
    /// dropped. Used by the cleanup sweep.
    pub fn retain(&mut self, f: impl FnMut(&ConnId) -> bool) -> usize {
        let before = self.queue.len();
        self.queue.retain(f);
        before - self.queue.len()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::conn::conn_for_test;

    #[test]
    fn enqueue_is_idempotent() {
        let mut pool = WaitingPool::new();
        let a = conn_for_test(1);
        let b = conn_for_test(2);
        pool.enqueue(a);
        pool.enqueue(b);
        pool.enqueue(a);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.snapshot(), vec![a, b]);
    }

    #[test]
    fn remove_preserves_order() {
        let mut pool = WaitingPool::new();
        for n in 1..=3 {
            pool.enqueue(conn_for_test(n));
        }
        assert!(pool.remove(conn_for_test(2)));
        assert!(!pool.remove(conn_for_test(2)));
        assert_eq!(pool.snapshot(), vec![conn_for_test(1), conn_for_test(3)]);
    }

    #[test]
    fn retain_reports_dropped_count() {
        let mut pool = WaitingPool::new();
        for n in 1..=4 {
            pool.enqueue(conn_for_test(n));
        }
        let dropped = pool.retain(|c| *c != conn_for_test(1) && *c != conn_for_test(3));
        assert_eq!(dropped, 2);
        assert_eq!(pool.len(), 2);
    }
}
