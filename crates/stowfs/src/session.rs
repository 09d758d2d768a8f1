//! Per-connection session context.

use uuid::Uuid;

/// Identity of the protocol session an adapter serves.
///
/// Carried into every adapter span so backend calls can be traced back to
/// the connection that issued them.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique id for this connection.
    pub id: Uuid,
    /// Authenticated user name.
    pub user: String,
}

impl Session {
    /// Create a session for `user` with a fresh id.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user: user.into(),
        }
    }

    /// Session for in-process callers with no authenticated user.
    pub fn anonymous() -> Self {
        Self::new("anonymous")
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::anonymous()
    }
}
