//! Services behind the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the upstream I/O so route handlers stay focused on
//! extracting request parts and shaping responses.

pub mod relay;
