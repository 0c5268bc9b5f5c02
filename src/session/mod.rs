//! Client-held authentication session.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session is owned by one client process. It is hydrated from the
//! persisted store on load, mutated by login / verify / logout / expiry, and
//! read by the guard to decide what a protected page may render.
//!
//! INVARIANTS
//! ==========
//! Fields are private and only whole-state transitions are exposed, so an
//! authenticated session always carries a non-empty token, and dropping the
//! token drops the user and the authenticated flag in the same call.

pub mod auth;
pub mod store;
pub mod token;
pub mod verify;

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const VERIFICATION_FAILED: &str = "Token verification failed";
pub const VERIFICATION_NETWORK_ERROR: &str = "Network error during token verification";
pub const SESSION_EXPIRED: &str = "Session expired. Please log in again.";

// =============================================================================
// USER PROFILE
// =============================================================================

/// Backend user identifier; numeric or string depending on the deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Profile record returned by the verification endpoint and cached locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Marketplace role, e.g. `admin`, `landlord`, `tenant`.
    #[serde(default)]
    pub role: String,
    /// Fields this crate does not interpret, kept for lossless persistence.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    token: Option<String>,
    user: Option<UserProfile>,
    is_authenticated: bool,
    is_loading: bool,
    token_valid: Option<bool>,
    error: Option<String>,
    last_activity: OffsetDateTime,
}

impl Session {
    /// An empty, unauthenticated session.
    #[must_use]
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            token: None,
            user: None,
            is_authenticated: false,
            is_loading: false,
            token_valid: None,
            error: None,
            last_activity: now,
        }
    }

    /// Rebuild a session from persisted entries. Authenticated only when both
    /// a non-empty token and a profile were stored.
    #[must_use]
    pub fn hydrate(token: Option<String>, user: Option<UserProfile>, now: OffsetDateTime) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        let is_authenticated = token.is_some() && user.is_some();
        let user = if token.is_some() { user } else { None };
        Self { token, user, is_authenticated, ..Self::new(now) }
    }

    /// Authenticate with a credential and profile. Returns `false` and leaves
    /// the session cleared when the token is empty.
    pub fn sign_in(&mut self, token: String, user: UserProfile, now: OffsetDateTime) -> bool {
        if token.trim().is_empty() {
            self.clear();
            return false;
        }
        self.token = Some(token);
        self.user = Some(user);
        self.is_authenticated = true;
        self.is_loading = false;
        self.error = None;
        self.last_activity = now;
        true
    }

    /// Drop credentials, profile, and error.
    pub fn clear(&mut self) {
        self.token = None;
        self.user = None;
        self.is_authenticated = false;
        self.is_loading = false;
        self.token_valid = None;
        self.error = None;
    }

    /// Drop credentials and record why.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.clear();
        self.error = Some(message.into());
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.is_loading = false;
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub fn set_token_valid(&mut self, valid: bool) {
        self.token_valid = Some(valid);
    }

    pub fn touch(&mut self, now: OffsetDateTime) {
        self.last_activity = now;
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Validity flag from the last successful verification, if any.
    #[must_use]
    pub fn token_valid(&self) -> Option<bool> {
        self.token_valid
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn last_activity(&self) -> OffsetDateTime {
        self.last_activity
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
