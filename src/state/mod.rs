//! Core state tables: registry, waiting pool, active matches, history.

pub mod conn;
pub mod history;
pub mod lobby;
pub mod matches;
pub mod pool;
pub mod registry;
pub mod user;

pub use conn::{ConnId, ConnIdGenerator};
pub use history::PairingHistory;
pub use lobby::{Lobby, MatchTiming, StatsSnapshot};
pub use matches::ActiveMatches;
pub use pool::WaitingPool;
pub use registry::{ConnectionRegistry, validate_name};
pub use user::{Identity, Status, User};
