//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds only immutable pieces: the relay (an HTTP client plus the
//! upstream origin) and router options. Cloning is cheap.

use crate::config::GatewayConfig;
use crate::services::relay::Relay;

#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
    /// Allow any origin, method, and header on the API routes.
    pub cors_permissive: bool,
}

impl AppState {
    #[must_use]
    pub fn new(relay: Relay, cors_permissive: bool) -> Self {
        Self { relay, cors_permissive }
    }

    /// # Errors
    ///
    /// Returns an error if the relay's HTTP client cannot be constructed.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let relay = Relay::new(config.upstream_base_url.as_str())?;
        Ok(Self::new(relay, config.cors_permissive))
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// State relaying to `upstream` with permissive CORS.
    #[must_use]
    pub fn test_app_state(upstream: &str) -> AppState {
        AppState::new(Relay::new(upstream).expect("client should build"), true)
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
