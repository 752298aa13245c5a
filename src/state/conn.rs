//! Connection handle generation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque handle for one live WebSocket connection.
///
/// Handles are minted by the gateway and never reused within a process
/// lifetime. All core tables key on `ConnId`; only the registry maps a
/// handle back to a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{:06}", self.0)
    }
}

/// Generates unique connection handles.
pub struct ConnIdGenerator {
    counter: AtomicU64,
}

impl ConnIdGenerator {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    /// Mint the next handle.
    pub fn next(&self) -> ConnId {
        ConnId(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn conn_for_test(n: u64) -> ConnId {
    ConnId(n)
}
