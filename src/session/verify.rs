//! Token verification against the backend.
//!
//! ERROR HANDLING
//! ==============
//! Verification never returns `Err`: every failure is a
//! `VerificationOutcome` variant so the guard can map it to a screen. A
//! non-2xx reply (or an unreadable 2xx body) is a rejection; a transport
//! failure is a network error and stays retryable.

use serde::Deserialize;
use tracing::{debug, warn};

use super::UserProfile;

pub const VERIFY_PATH: &str = "/api/auth/verify";

/// Result of checking a cached token against the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    Valid { user: UserProfile, valid: bool },
    Invalid { status: u16 },
    NetworkError { message: String },
}

/// Seam between the guard and the verification endpoint.
#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> VerificationOutcome;
}

#[derive(Deserialize)]
struct VerifyBody {
    user: UserProfile,
    #[serde(default = "default_valid")]
    valid: bool,
}

fn default_valid() -> bool {
    true
}

/// `GET {api}/api/auth/verify` with the token as a bearer credential.
#[derive(Clone)]
pub struct HttpTokenVerifier {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpTokenVerifier {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(api_base_url: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self::with_client(http, api_base_url))
    }

    #[must_use]
    pub fn with_client(http: reqwest::Client, api_base_url: &str) -> Self {
        let endpoint = format!("{}{VERIFY_PATH}", api_base_url.trim_end_matches('/'));
        Self { http, endpoint }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl TokenVerifier for HttpTokenVerifier {
    async fn verify(&self, token: &str) -> VerificationOutcome {
        let response = match self
            .http
            .get(&self.endpoint)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, endpoint = %self.endpoint, "token verification request failed");
                return VerificationOutcome::NetworkError { message: e.to_string() };
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "token rejected by backend");
            return VerificationOutcome::Invalid { status: status.as_u16() };
        }

        match response.json::<VerifyBody>().await {
            Ok(body) => VerificationOutcome::Valid { user: body.user, valid: body.valid },
            Err(e) => {
                warn!(error = %e, "unreadable verification response");
                VerificationOutcome::Invalid { status: status.as_u16() }
            }
        }
    }
}

#[cfg(test)]
#[path = "verify_test.rs"]
mod tests;
