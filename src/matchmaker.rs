//! Random pairing with a bias toward strangers.
//!
//! All functions here run on the coordinator task and mutate the Lobby
//! directly; there is no locking because nothing else can observe the
//! tables mid-update.

use crate::coordinator::Event;
use crate::error::{HandlerError, HandlerResult};
use crate::protocol::ServerMessage;
use crate::state::{ConnId, Lobby, Status, validate_name};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

/// Handle a `find-partner` request.
///
/// Validates the name, resolves the session identity, registers (or
/// re-registers) the user, tears down any current match, and then runs a
/// match attempt.
pub fn find_partner(
    lobby: &mut Lobby,
    conn: ConnId,
    username: &str,
    token: Option<&str>,
    rng: &mut impl Rng,
) -> HandlerResult {
    let name = validate_name(username)?;

    if lobby.registry.status(conn) == Some(Status::InCall) {
        return Err(HandlerError::AlreadyInCall);
    }

    let (identity, minted) = lobby.resolve_identity(conn, token);
    if minted {
        if !lobby.send_to(conn, ServerMessage::Session {
            token: identity.token(),
        }) {
            return Err(HandlerError::TransportClosed);
        }
    } else {
        debug!(%conn, %identity, "Returning session recognized");
    }

    lobby.registry.register(conn, name, identity)?;
    info!(%conn, %identity, name, "Partner search requested");

    // A repeat request while matched means "give me someone else".
    if lobby.matches.contains(conn) {
        end_match(lobby, conn);
    }
    lobby.pool.remove(conn);
    lobby.cancel_pending(conn);

    attempt_match(lobby, conn, rng);
    Ok(())
}

/// Try to pair `conn` with someone from the waiting pool.
///
/// Candidates that were never paired with this identity are preferred;
/// within the chosen tier the pick is uniformly random. With no usable
/// candidate the requester joins the pool and gets a `waiting` ack.
/// Returns whether a pairing was made.
pub fn attempt_match(lobby: &mut Lobby, conn: ConnId, rng: &mut impl Rng) -> bool {
    let Some(me) = lobby.registry.lookup(conn) else {
        return false;
    };
    if me.status == Status::InCall || lobby.matches.contains(conn) || !lobby.is_open(conn) {
        return false;
    }
    let my_identity = me.identity;
    let my_name = me.name.clone();

    loop {
        let mut fresh = Vec::new();
        let mut seen = Vec::new();
        for cand in lobby.pool.snapshot() {
            if cand == conn || lobby.matches.contains(cand) || !lobby.is_open(cand) {
                continue;
            }
            let Some(user) = lobby.registry.lookup(cand) else {
                continue;
            };
            if !matches!(user.status, Status::Available | Status::Waiting) {
                continue;
            }
            if lobby.history.were_paired(my_identity, user.identity) {
                seen.push(cand);
            } else {
                fresh.push(cand);
            }
        }

        let tier = if fresh.is_empty() { &seen } else { &fresh };
        let Some(&partner) = tier.choose(rng) else {
            // Nobody suitable: wait in line.
            lobby.pool.enqueue(conn);
            lobby.set_status(conn, Status::Waiting);
            let ack = ServerMessage::Waiting {
                message: "Waiting for a partner...".to_string(),
                waiting_count: lobby.pool.len(),
                available_users: lobby.registry.count_status(Status::Available),
            };
            lobby.send_to(conn, ack);
            debug!(%conn, queue = lobby.pool.len(), "No partner available, queued");
            return false;
        };

        // Both leave the pool before anything is sent.
        lobby.pool.remove(conn);
        lobby.pool.remove(partner);

        let Some(partner_user) = lobby.registry.lookup(partner) else {
            continue;
        };
        let partner_identity = partner_user.identity;
        let partner_name = partner_user.name.clone();

        // Computed before the history insert so both sides agree.
        let is_reconnection = lobby.history.were_paired(my_identity, partner_identity);

        let delivered = lobby.send_to(partner, ServerMessage::PartnerFound {
            partner: my_name.clone(),
            is_initiator: false,
            is_reconnection,
        });
        if !delivered {
            // Dead candidate; it is out of the pool already, try another.
            warn!(%partner, "Chosen partner unreachable, retrying selection");
            continue;
        }

        lobby.matches.insert(conn, partner);
        lobby.history.record(my_identity, partner_identity);
        lobby.set_status(conn, Status::Waiting);
        lobby.set_status(partner, Status::Waiting);
        lobby.cancel_pending(conn);
        lobby.cancel_pending(partner);
        lobby.send_to(conn, ServerMessage::PartnerFound {
            partner: partner_name,
            is_initiator: true,
            is_reconnection,
        });

        crate::metrics::inc_matches(is_reconnection);
        info!(%conn, %partner, is_reconnection, "Partners matched");
        return true;
    }
}

/// Tear down the match involving `conn`, if any. Returns the former
/// partner's handle.
///
/// The partner (not `conn` itself) is notified and, when still usable,
/// scheduled for a delayed re-queue.
pub fn end_match(lobby: &mut Lobby, conn: ConnId) -> Option<ConnId> {
    let partner = lobby.matches.remove(conn)?;

    let partner_open = lobby.is_open(partner);
    if partner_open {
        lobby.send_to(partner, ServerMessage::PartnerLeft);
    }
    lobby.set_status(conn, Status::Available);
    lobby.set_status(partner, Status::Available);
    debug!(%conn, %partner, "Match ended");

    if partner_open && lobby.registry.status(partner) == Some(Status::Available) {
        let delay = lobby.timing.settle_delay;
        lobby.schedule(partner, delay, Event::Requeue { conn: partner });
    }
    Some(partner)
}

/// Handle a `disconnect` request: leave the match, leave the pool, and
/// come back for a fresh search after the settle delay.
///
/// The requester passes through the transient disconnecting status so it
/// cannot be picked as a candidate mid-teardown.
pub fn disconnect_and_retry(lobby: &mut Lobby, conn: ConnId) {
    lobby.set_status(conn, Status::Disconnecting);
    end_match(lobby, conn);
    lobby.pool.remove(conn);
    lobby.set_status(conn, Status::Available);
    if lobby.is_open(conn) {
        let delay = lobby.timing.settle_delay;
        lobby.schedule(conn, delay, Event::Requeue { conn });
    }
}

/// A delayed re-queue fired. Re-validate everything before acting; the
/// world may have moved on since it was scheduled.
pub fn handle_requeue(lobby: &mut Lobby, conn: ConnId) {
    lobby.clear_pending(conn);
    if !lobby.is_open(conn)
        || lobby.registry.status(conn) != Some(Status::Available)
        || lobby.matches.contains(conn)
    {
        return;
    }
    lobby.pool.enqueue(conn);
    lobby.set_status(conn, Status::Waiting);
    let delay = lobby.timing.rematch_delay;
    lobby.schedule(conn, delay, Event::TryMatch { conn });
}

/// A delayed match attempt fired. Only acts if the handle is still in the
/// pool.
pub fn handle_try_match(lobby: &mut Lobby, conn: ConnId, rng: &mut impl Rng) {
    lobby.clear_pending(conn);
    if lobby.pool.contains(conn) {
        attempt_match(lobby, conn, rng);
    }
}
