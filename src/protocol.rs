//! Wire protocol for the WebSocket signaling channel.
//!
//! Every frame is a JSON object with a `type` discriminator (kebab-case).
//! Field names are camelCase to match the browser client. Negotiation
//! payloads (offer/answer/ICE candidate) are opaque `serde_json::Value`s —
//! the server never inspects them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Maximum chat message length in characters (after trimming).
pub const CHAT_MAX_CHARS: usize = 500;

/// Display name length bounds, inclusive.
pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 20;

/// Message types the server understands. Anything else is silently ignored.
const KNOWN_TYPES: &[&str] = &[
    "find-partner",
    "offer",
    "answer",
    "ice-candidate",
    "chat-message",
    "call-started",
    "call-ended",
    "disconnect",
];

/// Errors from decoding an inbound frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not a JSON object with a string `type` field")]
    MissingType,
}

/// A message received from a client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Request a partner. `token` is the session token from a previous
    /// visit, if the client kept one.
    FindPartner {
        username: String,
        #[serde(default)]
        token: Option<String>,
    },
    /// WebRTC offer, relayed verbatim to the partner.
    Offer { offer: Value },
    /// WebRTC answer, relayed verbatim.
    Answer { answer: Value },
    /// ICE candidate, relayed verbatim.
    IceCandidate { candidate: Value },
    /// In-call text chat.
    ChatMessage {
        message: String,
        #[serde(default)]
        sender: Option<String>,
    },
    /// Media is flowing; both peers move to in-call.
    CallStarted,
    /// Caller hung up but stays connected.
    CallEnded,
    /// Leave the current match and look for a new one.
    Disconnect,
}

impl ClientMessage {
    /// Message type tag, for logging and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FindPartner { .. } => "find-partner",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::ChatMessage { .. } => "chat-message",
            Self::CallStarted => "call-started",
            Self::CallEnded => "call-ended",
            Self::Disconnect => "disconnect",
        }
    }
}

/// A message sent to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Greeting sent as soon as the WebSocket is open.
    ConnectionEstablished { message: String },
    /// Session token minted for a new identity. Presenting it in a later
    /// `find-partner` keeps the pairing history across reconnects.
    Session { token: String },
    #[serde(rename_all = "camelCase")]
    PartnerFound {
        partner: String,
        /// Exactly one side of a pairing gets `true`; that side sends the
        /// first WebRTC offer.
        is_initiator: bool,
        /// Both sides saw each other in a previous session.
        is_reconnection: bool,
    },
    #[serde(rename_all = "camelCase")]
    Waiting {
        message: String,
        waiting_count: usize,
        available_users: usize,
    },
    PartnerLeft,
    Offer { offer: Value },
    Answer { answer: Value },
    IceCandidate { candidate: Value },
    ChatMessage {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sender: Option<String>,
    },
    UserCount { count: usize },
    #[serde(rename_all = "camelCase")]
    UserStats {
        total: usize,
        available: usize,
        waiting: usize,
        in_call: usize,
        waiting_queue: usize,
        active_matches: usize,
    },
    Error { message: String },
}

impl ServerMessage {
    /// Encode to a text frame.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to encode server message");
            r#"{"type":"error","message":"internal encoding error"}"#.to_string()
        })
    }
}

/// Decode an inbound text frame.
///
/// Returns `Ok(None)` for well-formed JSON carrying an unknown `type` —
/// those are ignored without a reply. Malformed JSON, a missing `type`, or
/// bad fields on a known type are errors and earn the client an `error`
/// reply.
pub fn parse_client(text: &str) -> Result<Option<ClientMessage>, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let ty = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;

    if !KNOWN_TYPES.contains(&ty) {
        return Ok(None);
    }

    Ok(Some(serde_json::from_value(value)?))
}
