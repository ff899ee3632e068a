//! Session-related types.
//!
//! Types stored in the session for authentication state. The admin flag is
//! deliberately absent: it is recomputed from the role table per request.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use classfete_core::UserId;

use crate::backend::AuthSession;

/// Refresh the access token when it expires within this window.
pub const REFRESH_MARGIN: TimeDelta = TimeDelta::seconds(30);

/// Session-stored user identity and backend tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionUser {
    /// Auth service user ID.
    pub id: UserId,
    /// Email, when the auth service has one.
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionUser {
    /// Whether the access token is expired or about to be.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= REFRESH_MARGIN
    }
}

impl From<AuthSession> for SessionUser {
    fn from(session: AuthSession) -> Self {
        Self {
            id: session.user.id,
            email: session.user.email,
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_at: session.expires_at,
        }
    }
}

impl std::fmt::Debug for SessionUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the intro animation having been shown this session.
    pub const INTRO_SEEN: &str = "intro_seen";
}
