//! Domain models.
//!
//! These are the shapes shared by the store implementations and the HTTP
//! layer. Field names are snake_case on the wire.

pub mod agent;
pub mod auth;
pub mod subscription;
