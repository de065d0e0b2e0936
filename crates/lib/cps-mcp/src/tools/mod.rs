//! MCP tool modules.
//!
//! Both tools live in one router: constrained SQL access to the
//! school/neighborhood table and semantic retrieval over school websites.

pub mod query;
