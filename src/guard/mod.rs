//! Route protection for session-gated pages.
//!
//! ARCHITECTURE
//! ============
//! `resolve` is a pure function from (session, config, verification phase)
//! to a single `GuardState`. `Guard` (in `runtime`) owns the side effects:
//! the verification call, the expiry interval, the redirect debounce, and
//! navigation. `screen` maps each terminal state to what the host renders.
//!
//! STATE PRECEDENCE
//! ================
//! Verifying > InsufficientRole > SessionExpired > VerificationError >
//! Authenticated > Unauthenticated / GuestAllowed.

pub mod runtime;
pub mod screen;

use std::collections::BTreeSet;
use std::fmt;

use crate::config::GuardSettings;
use crate::session::Session;

pub use runtime::{Guard, GuardEvent, Navigator};
pub use screen::{PrimaryAction, Render, Screen};

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Verifying,
    Authenticated,
    /// Route allows anonymous access and no one is signed in.
    GuestAllowed,
    Unauthenticated,
    SessionExpired,
    VerificationError { message: String },
    InsufficientRole { role: String },
}

impl GuardState {
    /// Whether the protected content may render.
    #[must_use]
    pub fn passes_through(&self) -> bool {
        matches!(self, Self::Authenticated | Self::GuestAllowed)
    }
}

impl fmt::Display for GuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verifying => f.write_str("verifying"),
            Self::Authenticated => f.write_str("authenticated"),
            Self::GuestAllowed => f.write_str("guest"),
            Self::Unauthenticated => f.write_str("unauthenticated"),
            Self::SessionExpired => f.write_str("session_expired"),
            Self::VerificationError { .. } => f.write_str("verification_error"),
            Self::InsufficientRole { .. } => f.write_str("insufficient_role"),
        }
    }
}

// =============================================================================
// ROLES
// =============================================================================

/// Roles allowed on a route. Empty means any signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(role: impl Into<String>) -> Self {
        std::iter::once(role.into()).collect()
    }

    #[must_use]
    pub fn permits(&self, role: &str) -> bool {
        self.0.is_empty() || self.0.contains(role)
    }

    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    pub require_auth: bool,
    pub roles: RoleSet,
    pub settings: GuardSettings,
}

impl GuardConfig {
    /// Signed-in users only, any role.
    #[must_use]
    pub fn protected(settings: GuardSettings) -> Self {
        Self { require_auth: true, roles: RoleSet::any(), settings }
    }

    /// Anonymous visitors pass through.
    #[must_use]
    pub fn public(settings: GuardSettings) -> Self {
        Self { require_auth: false, roles: RoleSet::any(), settings }
    }

    #[must_use]
    pub fn with_roles(mut self, roles: RoleSet) -> Self {
        self.roles = roles;
        self
    }
}

/// User interactions that count as activity while signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    PointerDown,
    PointerMove,
    KeyDown,
    Scroll,
    TouchStart,
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Decide the guard state for the current session.
#[must_use]
pub fn resolve(session: &Session, config: &GuardConfig, verifying: bool) -> GuardState {
    if verifying {
        return GuardState::Verifying;
    }

    if session.is_authenticated() {
        let role = session.user().map(|u| u.role.as_str()).unwrap_or_default();
        if !config.roles.permits(role) {
            return GuardState::InsufficientRole { role: role.to_owned() };
        }
    }

    if let Some(message) = session.error() {
        if message.contains("expired") {
            return GuardState::SessionExpired;
        }
        return GuardState::VerificationError { message: message.to_owned() };
    }

    if session.is_authenticated() {
        return GuardState::Authenticated;
    }

    if config.require_auth { GuardState::Unauthenticated } else { GuardState::GuestAllowed }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
