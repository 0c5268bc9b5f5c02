//! Session actions: login, logout, verification results, expiry, activity.
//!
//! `AuthStore` pairs the in-memory `Session` with its persisted copy. Every
//! action updates memory first and then storage; storage failures are logged
//! and never undo the in-memory transition.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};

use super::store::{SessionStore, StoreError};
use super::verify::VerificationOutcome;
use super::{SESSION_EXPIRED, Session, UserProfile, VERIFICATION_FAILED, VERIFICATION_NETWORK_ERROR, token};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("login requires a non-empty token")]
    EmptyToken,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct AuthStore {
    session: Session,
    store: Arc<dyn SessionStore>,
}

impl AuthStore {
    /// Load the persisted session. Unreadable storage starts a fresh session.
    #[must_use]
    pub fn hydrate(store: Arc<dyn SessionStore>, now: OffsetDateTime) -> Self {
        let session = match store.load() {
            Ok(persisted) => Session::hydrate(persisted.token, persisted.user, now),
            Err(e) => {
                warn!(error = %e, "session storage unreadable, starting signed out");
                Session::new(now)
            }
        };
        Self { session, store }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Authenticate and persist both entries.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty token (the session is left signed out)
    /// or when the entries cannot be written; in the latter case the
    /// in-memory session is still authenticated.
    pub fn login(&mut self, token: String, user: UserProfile, now: OffsetDateTime) -> Result<(), AuthError> {
        if !self.session.sign_in(token, user, now) {
            return Err(AuthError::EmptyToken);
        }
        if let (Some(token), Some(user)) = (self.session.token(), self.session.user()) {
            self.store.save(token, user)?;
            info!(user_id = %user.id, role = %user.role, "session started");
        }
        Ok(())
    }

    /// Clear memory and storage.
    pub fn logout(&mut self) {
        self.session.clear();
        self.clear_persisted();
        info!("session cleared");
    }

    /// Mark verification in flight and hand back the token to check.
    pub fn begin_verification(&mut self) -> Option<String> {
        let token = self.session.token()?.to_owned();
        self.session.set_loading(true);
        Some(token)
    }

    /// Fold a verification result into the session.
    pub fn apply_verification(&mut self, outcome: VerificationOutcome, now: OffsetDateTime) {
        match outcome {
            VerificationOutcome::Valid { user, valid } => {
                let Some(token) = self.session.token().map(str::to_owned) else {
                    // Logged out while the call was in flight.
                    self.session.set_loading(false);
                    return;
                };
                if self.session.sign_in(token, user, now) {
                    self.session.set_token_valid(valid);
                    if let (Some(token), Some(user)) = (self.session.token(), self.session.user()) {
                        if let Err(e) = self.store.save(token, user) {
                            warn!(error = %e, "failed to persist verified session");
                        }
                    }
                }
            }
            VerificationOutcome::Invalid { status } => {
                info!(status, "stored token rejected");
                self.session.fail(VERIFICATION_FAILED);
                self.clear_persisted();
            }
            VerificationOutcome::NetworkError { message } => {
                warn!(error = %message, "token verification unreachable");
                self.session.set_error(VERIFICATION_NETWORK_ERROR);
            }
        }
    }

    /// Drop the session if its token has expired. Returns `true` when it did.
    pub fn check_expiration(&mut self, now: OffsetDateTime) -> bool {
        let Some(current) = self.session.token() else {
            return false;
        };
        if !token::is_expired(current, now) {
            return false;
        }
        info!("session token expired");
        self.session.fail(SESSION_EXPIRED);
        self.clear_persisted();
        true
    }

    /// Record user activity; ignored while signed out.
    pub fn record_activity(&mut self, now: OffsetDateTime) {
        if self.session.is_authenticated() {
            self.session.touch(now);
        }
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.session.set_error(message);
    }

    pub fn clear_error(&mut self) {
        self.session.clear_error();
    }

    fn clear_persisted(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear persisted session");
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
