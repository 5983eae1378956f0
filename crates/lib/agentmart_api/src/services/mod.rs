//! Business operations behind the handlers.

pub mod agents;
pub mod subscriptions;
