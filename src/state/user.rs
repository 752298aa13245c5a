//! User records and the per-connection status state machine.

use crate::state::ConnId;
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Stable user identity, independent of any one connection.
///
/// Backed by a server-minted UUID handed to the client as a session token.
/// A client that presents the token on reconnect keeps its pairing history;
/// everything else about the user (name, status, handle) is per-connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity(Uuid);

impl Identity {
    /// Mint a fresh identity.
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a client-presented session token. Only exact, well-formed
    /// UUIDs are accepted — there is deliberately no fuzzy matching.
    pub fn parse(token: &str) -> Option<Self> {
        Uuid::parse_str(token).ok().map(Self)
    }

    /// Token form sent to the client.
    pub fn token(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Connected and pairable.
    Available,
    /// Looking for (or negotiating with) a partner.
    Waiting,
    /// In an active call; must not be offered new partners.
    InCall,
    /// Transient state during teardown.
    Disconnecting,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Waiting => "waiting",
            Self::InCall => "in-call",
            Self::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered user, created on the first valid `find-partner` and
/// destroyed when the connection goes away.
#[derive(Debug, Clone)]
pub struct User {
    pub identity: Identity,
    pub name: String,
    pub status: Status,
    pub status_changed_at: DateTime<Utc>,
    pub joined_at: DateTime<Utc>,
    /// The connection that owns this record.
    pub conn: ConnId,
}

impl User {
    pub fn new(identity: Identity, name: String, conn: ConnId) -> Self {
        let now = Utc::now();
        Self {
            identity,
            name,
            status: Status::Available,
            status_changed_at: now,
            joined_at: now,
            conn,
        }
    }
}
