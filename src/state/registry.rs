//! ConnectionRegistry — the handle→user table.

use crate::error::HandlerError;
use crate::protocol::{NAME_MAX_CHARS, NAME_MIN_CHARS};
use crate::state::{ConnId, Identity, Status, User};
use chrono::Utc;
use std::collections::HashMap;

/// Maps live connection handles to user records. The registry is the sole
/// owner of that mapping; the pool and match table hold lookup keys only.
#[derive(Default)]
pub struct ConnectionRegistry {
    users: HashMap<ConnId, User>,
}

/// Validate and trim a display name.
pub fn validate_name(name: &str) -> Result<&str, HandlerError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len < NAME_MIN_CHARS || len > NAME_MAX_CHARS {
        return Err(HandlerError::InvalidName);
    }
    Ok(trimmed)
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) the user record for a connection.
    ///
    /// Re-registration with a new name is how the original client changes
    /// its display name, so an existing record is simply overwritten.
    pub fn register(
        &mut self,
        conn: ConnId,
        name: &str,
        identity: Identity,
    ) -> Result<Identity, HandlerError> {
        let trimmed = validate_name(name)?;
        self.users
            .insert(conn, User::new(identity, trimmed.to_string(), conn));
        Ok(identity)
    }

    /// Look up the user for a handle. A miss is non-fatal and means
    /// "no such user" to every caller.
    pub fn lookup(&self, conn: ConnId) -> Option<&User> {
        self.users.get(&conn)
    }

    pub fn contains(&self, conn: ConnId) -> bool {
        self.users.contains_key(&conn)
    }

    pub fn status(&self, conn: ConnId) -> Option<Status> {
        self.users.get(&conn).map(|u| u.status)
    }

    /// Record a status transition. Returns the old status, or `None` on a
    /// lookup miss. Pool removal and the stats notification are the
    /// Lobby's job — see [`crate::state::Lobby::set_status`].
    pub fn set_status(&mut self, conn: ConnId, status: Status) -> Option<Status> {
        let user = self.users.get_mut(&conn)?;
        let old = user.status;
        user.status = status;
        user.status_changed_at = Utc::now();
        Some(old)
    }

    pub fn remove(&mut self, conn: ConnId) -> Option<User> {
        self.users.remove(&conn)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Count users in a given status.
    pub fn count_status(&self, status: Status) -> usize {
        self.users.values().filter(|u| u.status == status).count()
    }

    /// Iterate all handles, for the cleanup sweep.
    pub fn handles(&self) -> impl Iterator<Item = ConnId> + '_ {
        self.users.keys().copied()
    }
}
