//! PairingHistory — who has been matched with whom.

use crate::state::Identity;
use std::collections::{HashMap, HashSet};

/// Process-wide record of past pairings, keyed by stable identity.
///
/// Entries are added symmetrically and never pruned: history outlives
/// connections by design, so a returning client keeps its novelty bias.
#[derive(Default)]
pub struct PairingHistory {
    partners: HashMap<Identity, HashSet<Identity>>,
}

impl PairingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Have these two identities been paired before?
    pub fn were_paired(&self, a: Identity, b: Identity) -> bool {
        self.partners.get(&a).is_some_and(|set| set.contains(&b))
    }

    /// Record a pairing, both directions.
    pub fn record(&mut self, a: Identity, b: Identity) {
        self.partners.entry(a).or_default().insert(b);
        self.partners.entry(b).or_default().insert(a);
    }

    /// Past partners of one identity. Empty for an unknown identity.
    pub fn partners_of(&self, id: Identity) -> Option<&HashSet<Identity>> {
        self.partners.get(&id)
    }

    /// Number of identities with at least one recorded pairing.
    pub fn identities(&self) -> usize {
        self.partners.len()
    }

    /// Total directed history entries, for the periodic stats log.
    pub fn total_entries(&self) -> usize {
        self.partners.values().map(HashSet::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_symmetric() {
        let mut history = PairingHistory::new();
        let (a, b) = (Identity::mint(), Identity::mint());
        history.record(a, b);
        assert!(history.were_paired(a, b));
        assert!(history.were_paired(b, a));
    }

    #[test]
    fn unknown_identities_were_never_paired() {
        let history = PairingHistory::new();
        assert!(!history.were_paired(Identity::mint(), Identity::mint()));
    }

    #[test]
    fn record_is_idempotent() {
        let mut history = PairingHistory::new();
        let (a, b) = (Identity::mint(), Identity::mint());
        history.record(a, b);
        history.record(a, b);
        assert_eq!(history.partners_of(a).unwrap().len(), 1);
        assert_eq!(history.total_entries(), 2);
    }
}
