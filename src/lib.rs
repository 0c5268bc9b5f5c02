//! # rentals-gateway
//!
//! Edge pieces of the rentals marketplace: the API relay that forwards
//! `/api/proxy/*` calls to the backend, and the session guard that decides
//! whether a protected page may render for the current client session.
//!
//! The relay is served by the binary (`rentals-gateway serve`). The guard is a
//! library state machine driven by its host (the `session` CLI commands here,
//! a UI shell elsewhere) through an injected store, verifier, and navigator.

pub mod config;
pub mod guard;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
