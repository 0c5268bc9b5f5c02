//! `/api/proxy/{*path}`: forward the call to the upstream API.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};

use crate::services::relay::{ProxyRequest, ProxyResponse, RelayError};
use crate::state::AppState;

pub const PROXY_ROUTE: &str = "/api/proxy/{*path}";
const PROXY_PREFIX: &str = "/api/proxy/";

/// Relay any supported method. The path tail is taken from the raw URI so
/// percent-encoded segments reach the upstream unchanged.
pub async fn relay(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ProxyResponse, RelayError> {
    let tail = uri.path().strip_prefix(PROXY_PREFIX).unwrap_or_default();
    let request = ProxyRequest::from_parts(method, tail, uri.query(), &headers, &body);
    state.relay.forward(request).await
}

#[cfg(test)]
#[path = "proxy_test.rs"]
mod tests;
