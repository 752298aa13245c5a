//! duetd - random 1:1 pairing and WebRTC signaling server.
//!
//! Clients connect over WebSocket, ask for a partner, and get paired at
//! random with a bias toward people they have not met before. Once paired,
//! the server relays WebRTC negotiation frames and chat between the two
//! sides without inspecting them.
//!
//! All state lives in a single [`state::Lobby`] owned by the
//! [`coordinator::Coordinator`] event loop; connection tasks only move
//! frames between sockets and the coordinator's inbox.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod matchmaker;
pub mod metrics;
pub mod network;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod state;
pub mod sweeper;
