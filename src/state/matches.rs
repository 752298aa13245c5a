//! ActiveMatches — the symmetric pairing table.

use crate::state::ConnId;
use std::collections::HashMap;

/// Confirmed 1:1 pairings.
///
/// Invariant: `partner_of(a) == Some(b)` iff `partner_of(b) == Some(a)`;
/// a handle has at most one partner. Both directions are always inserted
/// and removed together, so a half-written pair is never observable.
#[derive(Default)]
pub struct ActiveMatches {
    pairs: HashMap<ConnId, ConnId>,
}

impl ActiveMatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a pairing, both directions at once.
    ///
    /// Callers must have unwound any previous match for either handle;
    /// this is debug-asserted rather than silently patched because a
    /// violated precondition means the caller's teardown is broken.
    pub fn insert(&mut self, a: ConnId, b: ConnId) {
        debug_assert_ne!(a, b, "a handle cannot be matched with itself");
        debug_assert!(!self.pairs.contains_key(&a));
        debug_assert!(!self.pairs.contains_key(&b));
        self.pairs.insert(a, b);
        self.pairs.insert(b, a);
    }

    pub fn partner_of(&self, conn: ConnId) -> Option<ConnId> {
        self.pairs.get(&conn).copied()
    }

    pub fn contains(&self, conn: ConnId) -> bool {
        self.pairs.contains_key(&conn)
    }

    /// Remove the pairing involving `conn`, both directions. Returns the
    /// former partner.
    pub fn remove(&mut self, conn: ConnId) -> Option<ConnId> {
        let partner = self.pairs.remove(&conn)?;
        self.pairs.remove(&partner);
        Some(partner)
    }

    /// Number of active pairings (not handles).
    pub fn len(&self) -> usize {
        self.pairs.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate each pair once, `(a, b)` with `a < b`.
    pub fn iter_pairs(&self) -> impl Iterator<Item = (ConnId, ConnId)> + '_ {
        self.pairs
            .iter()
            .filter(|(a, b)| a < b)
            .map(|(&a, &b)| (a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::conn::conn_for_test;

    #[test]
    fn insert_is_symmetric() {
        let mut matches = ActiveMatches::new();
        let (a, b) = (conn_for_test(1), conn_for_test(2));
        matches.insert(a, b);
        assert_eq!(matches.partner_of(a), Some(b));
        assert_eq!(matches.partner_of(b), Some(a));
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn remove_deletes_both_directions() {
        let mut matches = ActiveMatches::new();
        let (a, b) = (conn_for_test(1), conn_for_test(2));
        matches.insert(a, b);
        assert_eq!(matches.remove(b), Some(a));
        assert!(!matches.contains(a));
        assert!(!matches.contains(b));
        assert_eq!(matches.remove(a), None);
    }

    #[test]
    fn iter_pairs_yields_each_pair_once() {
        let mut matches = ActiveMatches::new();
        matches.insert(conn_for_test(1), conn_for_test(2));
        matches.insert(conn_for_test(4), conn_for_test(3));
        let pairs: Vec<_> = matches.iter_pairs().collect();
        assert_eq!(pairs.len(), 2);
    }
}
