//! Local expiry check for bearer tokens.
//!
//! Tokens are opaque to the gateway except for one courtesy: when a token is
//! a JWT, its `exp` claim is read (without signature verification) so an
//! expired session is dropped without waiting for the backend to reject it.
//! Tokens that are not JWTs, or carry no `exp`, never expire locally.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use time::OffsetDateTime;

/// Expiry instant from a JWT `exp` claim, if the token has one.
#[must_use]
pub fn expires_at(token: &str) -> Option<OffsetDateTime> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?;
    #[allow(clippy::cast_possible_truncation)]
    let secs = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))?;
    OffsetDateTime::from_unix_timestamp(secs).ok()
}

/// `true` once `now` has reached the token's expiry.
#[must_use]
pub fn is_expired(token: &str, now: OffsetDateTime) -> bool {
    expires_at(token).is_some_and(|exp| now >= exp)
}

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;
