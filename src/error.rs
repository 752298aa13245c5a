//! Unified error handling for duetd.
//!
//! Handler errors carry a static code for metrics labeling and map to the
//! client-visible `error` frame where one is warranted.

use crate::protocol::ServerMessage;
use thiserror::Error;

/// Errors that can occur while handling one inbound message.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid display name")]
    InvalidName,

    #[error("already in a call")]
    AlreadyInCall,

    #[error("chat message too long")]
    ChatTooLong,

    #[error("partner missing or unreachable")]
    PartnerUnavailable,

    #[error("malformed frame: {0}")]
    Malformed(#[from] crate::protocol::ProtocolError),

    /// The sender's own transport is gone; a close event is already on its
    /// way, so there is nobody to reply to.
    #[error("transport closed")]
    TransportClosed,
}

impl HandlerError {
    /// Static error code for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidName => "invalid_name",
            Self::AlreadyInCall => "already_in_call",
            Self::ChatTooLong => "chat_too_long",
            Self::PartnerUnavailable => "partner_unavailable",
            Self::Malformed(_) => "malformed",
            Self::TransportClosed => "transport_closed",
        }
    }

    /// Convert to a client-visible `error` reply.
    ///
    /// Returns `None` for errors that don't warrant a reply (e.g. the
    /// sender's transport is already gone).
    pub fn to_reply(&self) -> Option<ServerMessage> {
        let message = match self {
            Self::InvalidName => "Invalid username! Use 2-20 characters.",
            Self::AlreadyInCall => "End your current call before finding a new partner.",
            Self::ChatTooLong => "Message too long! Maximum 500 characters.",
            Self::PartnerUnavailable => "Partner not found! Trying to re-match.",
            Self::Malformed(_) => "Invalid message format.",
            Self::TransportClosed => return None,
        };
        Some(ServerMessage::Error {
            message: message.to_string(),
        })
    }
}

/// Result type for message handlers.
pub type HandlerResult = Result<(), HandlerError>;
