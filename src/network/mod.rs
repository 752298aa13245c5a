//! WebSocket transport: the listener and the per-connection task.

pub mod connection;
pub mod gateway;

pub use connection::Connection;
pub use gateway::Gateway;
