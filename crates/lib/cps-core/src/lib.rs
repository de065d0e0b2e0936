//! Core types and services for cps-data-mcp.
//!
//! This crate owns the read-only store backends (the `schooltoneighborhood`
//! SQLite table and the `webpagechunk` vector index), the SQL guard, the
//! question-embedding layer, and the control plane that ties them together.

pub mod control;
pub mod embed;
pub mod services;
pub mod store;
