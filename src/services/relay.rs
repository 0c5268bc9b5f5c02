//! API relay: forward a proxied call to the upstream origin and mirror the reply.
//!
//! DESIGN
//! ======
//! The relay is stateless apart from a shared `reqwest::Client` and the
//! upstream origin. A request is reduced to a `ProxyRequest` (method, path
//! segments, raw query, optional `Authorization`, optional JSON body) and
//! replayed upstream with `Content-Type: application/json`. No other
//! incoming header is forwarded.
//!
//! TRADE-OFFS
//! ==========
//! Incoming bodies are parsed best-effort: an empty or malformed body is
//! dropped and the call proceeds without one, rather than failing with 400.
//! Upstream JSON is parsed and re-emitted, so a malformed JSON reply becomes
//! a relay error instead of being passed through.
//!
//! ERROR HANDLING
//! ==============
//! Every failure maps to one uniform 500 body through `RelayError`'s
//! `IntoResponse` impl. The upstream status is otherwise preserved exactly.

use axum::Json;
use axum::body::Bytes;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::{debug, error};

pub const PROXY_ERROR: &str = "Error proxying to API";

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned malformed JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        error!(error = %self, "relay failed");
        let body = json!({ "error": PROXY_ERROR, "message": self.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

// =============================================================================
// REQUEST
// =============================================================================

/// The parts of an incoming call that survive the hop upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    pub method: Method,
    pub segments: Vec<String>,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    pub authorization: Option<HeaderValue>,
    pub body: Option<Value>,
}

impl ProxyRequest {
    /// Build from the wildcard path tail, raw query, headers, and body bytes.
    #[must_use]
    pub fn from_parts(method: Method, path: &str, query: Option<&str>, headers: &HeaderMap, body: &[u8]) -> Self {
        let body = parse_body(&method, body);
        Self {
            method,
            segments: split_segments(path),
            query: query.filter(|q| !q.is_empty()).map(str::to_owned),
            authorization: headers.get(AUTHORIZATION).cloned(),
            body,
        }
    }
}

/// Split a path tail into non-empty segments.
#[must_use]
pub fn split_segments(path: &str) -> Vec<String> {
    path.split('/').filter(|s| !s.is_empty()).map(str::to_owned).collect()
}

/// Best-effort JSON parse of an incoming body. GET and HEAD never carry one.
#[must_use]
pub fn parse_body(method: &Method, body: &[u8]) -> Option<Value> {
    if *method == Method::GET || *method == Method::HEAD || body.is_empty() {
        return None;
    }
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "ignoring unparseable request body");
            None
        }
    }
}

#[must_use]
pub fn upstream_url(origin: &str, segments: &[String], query: Option<&str>) -> String {
    let mut url = format!("{}/{}", origin.trim_end_matches('/'), segments.join("/"));
    if let Some(query) = query {
        url.push('?');
        url.push_str(query);
    }
    url
}

#[must_use]
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains(JSON_CONTENT_TYPE)
}

// =============================================================================
// RESPONSE
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RelayBody {
    Json(Value),
    /// Opaque upstream body and the content type to send it with.
    Text { content_type: String, body: Bytes },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: RelayBody,
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        match self.body {
            RelayBody::Json(value) => (self.status, Json(value)).into_response(),
            RelayBody::Text { content_type, body } => {
                (self.status, [(CONTENT_TYPE, content_type)], body).into_response()
            }
        }
    }
}

// =============================================================================
// RELAY
// =============================================================================

#[derive(Clone)]
pub struct Relay {
    http: reqwest::Client,
    upstream: String,
}

impl Relay {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(upstream: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self::with_client(http, upstream))
    }

    #[must_use]
    pub fn with_client(http: reqwest::Client, upstream: impl Into<String>) -> Self {
        let upstream = upstream.into().trim_end_matches('/').to_owned();
        Self { http, upstream }
    }

    #[must_use]
    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    /// Replay `request` upstream and translate the reply.
    ///
    /// # Errors
    ///
    /// Returns `RelayError` on transport failure, an unreadable reply, or a
    /// reply labelled JSON that does not parse.
    pub async fn forward(&self, request: ProxyRequest) -> Result<ProxyResponse, RelayError> {
        let url = upstream_url(&self.upstream, &request.segments, request.query.as_deref());
        // HEAD is answered from a GET; axum drops the body on the way out.
        let method = if request.method == Method::HEAD { Method::GET } else { request.method };
        debug!(%method, %url, "relaying request");

        let mut outgoing = self
            .http
            .request(method, &url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        if let Some(authorization) = request.authorization {
            outgoing = outgoing.header(AUTHORIZATION, authorization);
        }
        if let Some(body) = &request.body {
            outgoing = outgoing.json(body);
        }

        let response = outgoing.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = response.bytes().await?;

        let body = match content_type {
            Some(ct) if is_json_content_type(&ct) && !bytes.is_empty() => {
                RelayBody::Json(serde_json::from_slice(&bytes).map_err(RelayError::MalformedJson)?)
            }
            other => RelayBody::Text {
                content_type: other.unwrap_or_else(|| TEXT_CONTENT_TYPE.to_owned()),
                body: bytes,
            },
        };
        debug!(status = status.as_u16(), "upstream replied");
        Ok(ProxyResponse { status, body })
    }
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
