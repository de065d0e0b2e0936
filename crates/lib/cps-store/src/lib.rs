//! Storage models and schema helpers for cps-data-mcp.
//!
//! This crate defines the canonical data model shared by the control plane
//! and the storage backends.

pub mod models;
pub mod schema;

pub use models::*;
