//! HTTP surface of the Ephemera video sharing service.
//!
//! The storage core lives in `ephemera-blob`; this crate adds upload
//! validation ([`ingress`]), lookup with the TTL check ([`resolver`]), the
//! share pages ([`render`]) and the axum router ([`api`]).

pub mod api;
pub mod config;
pub mod error;
pub mod ingress;
pub mod metrics;
pub mod render;
pub mod resolver;
pub mod telemetry;
