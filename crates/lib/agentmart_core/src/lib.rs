//! # agentmart_core
//!
//! Core domain logic for Agentmart: the agent catalog, subscriptions, and
//! the authorization decision layer in front of them.

pub mod auth;
pub mod catalog;
pub mod migrate;
pub mod models;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
