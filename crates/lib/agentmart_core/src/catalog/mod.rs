//! Agent catalog and subscription persistence.
//!
//! Two backends implement both store traits: [`pg::PgStore`] over Postgres and
//! [`memory::MemoryStore`] for tests and local runs. Business rules such as
//! "one active subscription per agent" live in the API services; the stores
//! only enforce agent name uniqueness and the agent/subscription cascade.

pub mod memory;
pub mod pg;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::agent::{Agent, AgentFilter, Page, UnknownVariant};
use crate::models::subscription::{Subscription, UserSubscription};

/// Persistence errors. The `Display` output of the domain variants is the
/// caller-visible detail message.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("An agent with this name already exists")]
    DuplicateName,

    #[error("Agent not found")]
    AgentNotFound,

    #[error("Subscription not found")]
    SubscriptionNotFound,

    #[error("User already has an active subscription for this agent")]
    AlreadySubscribed,

    #[error("Not authorized to unsubscribe for another user")]
    NotSubscriptionOwner,

    #[error("Corrupt stored value: {0}")]
    Corrupt(#[from] UnknownVariant),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Backend status reported by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreHealth {
    pub backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Filtered page ordered by `display_order`, then name.
    async fn list_agents(&self, filter: &AgentFilter) -> Result<Vec<Agent>, CatalogError>;

    /// Case-insensitive substring match on name or description, same order.
    async fn search_agents(&self, query: &str, page: Page) -> Result<Vec<Agent>, CatalogError>;

    async fn get_agent(&self, id: Uuid) -> Result<Option<Agent>, CatalogError>;

    /// Stored image bytes. `None` when the agent is missing or has no image.
    async fn get_agent_image(&self, id: Uuid) -> Result<Option<Vec<u8>>, CatalogError>;

    async fn agent_name_exists(&self, name: &str) -> Result<bool, CatalogError>;

    /// Insert. Fails with [`CatalogError::DuplicateName`] on a name clash.
    async fn create_agent(&self, agent: Agent) -> Result<Agent, CatalogError>;

    /// Replace every mutable column of an existing agent.
    async fn update_agent(&self, agent: Agent) -> Result<Agent, CatalogError>;

    /// Delete the agent and its subscriptions. Returns false if it did not exist.
    async fn delete_agent(&self, id: Uuid) -> Result<bool, CatalogError>;

    async fn health(&self) -> Result<StoreHealth, CatalogError>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get_subscription(&self, id: Uuid) -> Result<Option<Subscription>, CatalogError>;

    /// The user's active subscription for `agent_id`, if any.
    async fn find_active_subscription(
        &self,
        user_id: &str,
        agent_id: Uuid,
    ) -> Result<Option<Subscription>, CatalogError>;

    async fn create_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, CatalogError>;

    /// Persist status, expiry and modality changes of an existing subscription.
    async fn update_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, CatalogError>;

    /// The user's active subscriptions joined with their agents, oldest first.
    async fn user_subscriptions(&self, user_id: &str)
    -> Result<Vec<UserSubscription>, CatalogError>;
}

/// A backend implementing both stores.
pub trait Store: CatalogStore + SubscriptionStore {}

impl<T: CatalogStore + SubscriptionStore> Store for T {}

pub type DynCatalogStore = Arc<dyn CatalogStore>;
pub type DynSubscriptionStore = Arc<dyn SubscriptionStore>;
