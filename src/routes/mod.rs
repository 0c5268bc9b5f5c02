//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The gateway exposes one generic relay route, `/api/proxy/{*path}`, for
//! GET/POST/PUT/PATCH/DELETE (HEAD rides on GET), plus `/healthz`. CORS is
//! permissive unless `CORS_PERMISSIVE` turns it off.

pub mod proxy;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router.
#[must_use]
pub fn app(state: AppState) -> Router {
    let cors_permissive = state.cors_permissive;

    let router = Router::new()
        .route(
            proxy::PROXY_ROUTE,
            get(proxy::relay)
                .post(proxy::relay)
                .put(proxy::relay)
                .patch(proxy::relay)
                .delete(proxy::relay)
                // Bodies are relayed as-is; size is the upstream's concern.
                .layer(DefaultBodyLimit::disable()),
        )
        .route("/healthz", get(healthz))
        .with_state(state);

    let router = if cors_permissive {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
