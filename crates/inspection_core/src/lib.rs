//! inspection_core — domain core for the field-inspection backend.
//!
//! Pure domain logic: no sqlx, no axum, no filesystem. Storage is reached
//! through the port traits in [`ports`]; the server and postgres crates
//! provide the adapters.
//!
//! Modules:
//! - [`types`] — domain value types and enums
//! - [`error`] — the error taxonomy with HTTP status mapping
//! - [`principal`] — authenticated caller identity and access rules
//! - [`template`] — template catalogue (ordered sections and fields)
//! - [`merge`] — deep-merge and field-ordering primitives
//! - [`engine`] — the section aggregation engine
//! - [`ports`] — storage port traits
//! - [`service`] — the orchestration service the HTTP layer calls

pub mod engine;
pub mod error;
pub mod merge;
pub mod ports;
pub mod principal;
pub mod service;
pub mod template;
pub mod types;
