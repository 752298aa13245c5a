//! Relaying of negotiation and chat frames between matched peers.
//!
//! Offer, answer, and ICE payloads are opaque; the server forwards them
//! without inspection. Chat is the only relayed frame with server-side
//! policy (trimming and a length cap).

use crate::error::{HandlerError, HandlerResult};
use crate::protocol::{CHAT_MAX_CHARS, ServerMessage};
use crate::state::{ConnId, Lobby, Status};
use serde_json::Value;
use tracing::{debug, warn};

/// Forward a WebRTC offer to the partner.
pub fn relay_offer(lobby: &mut Lobby, conn: ConnId, offer: Value) -> HandlerResult {
    relay_required(lobby, conn, ServerMessage::Offer { offer }, "offer")
}

/// Forward a WebRTC answer to the partner.
pub fn relay_answer(lobby: &mut Lobby, conn: ConnId, answer: Value) -> HandlerResult {
    relay_required(lobby, conn, ServerMessage::Answer { answer }, "answer")
}

/// Forward an ICE candidate to the partner.
///
/// Candidates trickle in during and after negotiation, so a missing or
/// unreachable partner is not an error here; the frame is dropped.
pub fn relay_ice(lobby: &mut Lobby, conn: ConnId, candidate: Value) -> HandlerResult {
    let Some(partner) = lobby.matches.partner_of(conn) else {
        debug!(%conn, "ICE candidate with no partner, dropped");
        return Ok(());
    };
    if lobby.send_to(partner, ServerMessage::IceCandidate { candidate }) {
        crate::metrics::inc_relayed("ice-candidate");
    }
    Ok(())
}

/// Forward an in-call chat message.
///
/// The message is trimmed first; an empty result is dropped without a
/// reply, and anything over the cap is rejected.
pub fn relay_chat(
    lobby: &mut Lobby,
    conn: ConnId,
    message: &str,
    sender: Option<String>,
) -> HandlerResult {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    if trimmed.chars().count() > CHAT_MAX_CHARS {
        return Err(HandlerError::ChatTooLong);
    }
    let sender = sender.or_else(|| lobby.registry.lookup(conn).map(|u| u.name.clone()));
    relay_required(
        lobby,
        conn,
        ServerMessage::ChatMessage {
            message: trimmed.to_string(),
            sender,
        },
        "chat-message",
    )
}

/// Forward a frame that only makes sense with a reachable partner.
///
/// When the partner is missing or gone the sender's state is unwound and
/// a delayed retry is scheduled, then the failure is reported so the
/// caller can send the error reply.
fn relay_required(
    lobby: &mut Lobby,
    conn: ConnId,
    msg: ServerMessage,
    kind: &'static str,
) -> HandlerResult {
    let Some(partner) = lobby.matches.partner_of(conn) else {
        debug!(%conn, kind, "Relay with no partner");
        crate::matchmaker::disconnect_and_retry(lobby, conn);
        return Err(HandlerError::PartnerUnavailable);
    };
    if !lobby.send_to(partner, msg) {
        warn!(%conn, %partner, kind, "Partner unreachable during relay");
        crate::matchmaker::disconnect_and_retry(lobby, conn);
        return Err(HandlerError::PartnerUnavailable);
    }
    crate::metrics::inc_relayed(kind);
    Ok(())
}

/// Media is flowing: both sides of the pairing move to in-call.
pub fn call_started(lobby: &mut Lobby, conn: ConnId) {
    lobby.set_status(conn, Status::InCall);
    if let Some(partner) = lobby.matches.partner_of(conn) {
        lobby.set_status(partner, Status::InCall);
    }
}

/// The caller hung up media but kept the connection.
pub fn call_ended(lobby: &mut Lobby, conn: ConnId) {
    lobby.set_status(conn, Status::Available);
}
