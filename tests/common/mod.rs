//! Shared helpers for integration tests.

pub mod client;
pub mod server;
