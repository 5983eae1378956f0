//! In-memory catalog and subscription store.
//!
//! Backs the integration tests and `--in-memory` server runs. Agent names are
//! reserved in a separate map so concurrent creates and renames cannot both
//! claim the same name.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::{CatalogError, CatalogStore, StoreHealth, SubscriptionStore};
use crate::models::agent::{self, Agent, AgentFilter, Page};
use crate::models::subscription::{Subscription, UserSubscription};

#[derive(Debug, Default)]
pub struct MemoryStore {
    agents: DashMap<Uuid, Agent>,
    names: DashMap<String, Uuid>,
    subscriptions: DashMap<Uuid, Subscription>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach image bytes to an existing agent.
    pub fn set_agent_image(&self, id: Uuid, bytes: Vec<u8>) -> Result<(), CatalogError> {
        let mut agent = self.agents.get_mut(&id).ok_or(CatalogError::AgentNotFound)?;
        agent.image_data = Some(bytes);
        Ok(())
    }

    fn sorted_agents(&self, keep: impl Fn(&Agent) -> bool) -> Vec<Agent> {
        let mut agents: Vec<Agent> = self
            .agents
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| {
                let mut agent = entry.value().clone();
                agent.image_data = None;
                agent
            })
            .collect();
        agent::sort_for_listing(&mut agents);
        agents
    }

    fn reserve_name(&self, name: &str, id: Uuid) -> Result<(), CatalogError> {
        match self.names.entry(name.to_string()) {
            Entry::Occupied(entry) if *entry.get() != id => Err(CatalogError::DuplicateName),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(entry) => {
                entry.insert(id);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_agents(&self, filter: &AgentFilter) -> Result<Vec<Agent>, CatalogError> {
        Ok(filter.page.slice(self.sorted_agents(|a| filter.matches(a))))
    }

    async fn search_agents(&self, query: &str, page: Page) -> Result<Vec<Agent>, CatalogError> {
        Ok(page.slice(self.sorted_agents(|a| agent::matches_query(a, query))))
    }

    async fn get_agent(&self, id: Uuid) -> Result<Option<Agent>, CatalogError> {
        Ok(self.agents.get(&id).map(|a| a.value().clone()))
    }

    async fn get_agent_image(&self, id: Uuid) -> Result<Option<Vec<u8>>, CatalogError> {
        Ok(self.agents.get(&id).and_then(|a| a.image_data.clone()))
    }

    async fn agent_name_exists(&self, name: &str) -> Result<bool, CatalogError> {
        Ok(self.names.contains_key(name))
    }

    async fn create_agent(&self, agent: Agent) -> Result<Agent, CatalogError> {
        self.reserve_name(&agent.name, agent.id)?;
        self.agents.insert(agent.id, agent.clone());
        Ok(agent)
    }

    async fn update_agent(&self, agent: Agent) -> Result<Agent, CatalogError> {
        let previous_name = self
            .agents
            .get(&agent.id)
            .map(|a| a.name.clone())
            .ok_or(CatalogError::AgentNotFound)?;

        if previous_name != agent.name {
            self.reserve_name(&agent.name, agent.id)?;
            self.names.remove(&previous_name);
        }

        let mut stored = self
            .agents
            .get_mut(&agent.id)
            .ok_or(CatalogError::AgentNotFound)?;
        let image_data = stored.image_data.take();
        *stored = Agent {
            image_data,
            created_at: stored.created_at,
            ..agent
        };
        Ok(stored.clone())
    }

    async fn delete_agent(&self, id: Uuid) -> Result<bool, CatalogError> {
        let Some((_, agent)) = self.agents.remove(&id) else {
            return Ok(false);
        };
        self.names.remove(&agent.name);
        self.subscriptions.retain(|_, s| s.agent_id != id);
        Ok(true)
    }

    async fn health(&self) -> Result<StoreHealth, CatalogError> {
        Ok(StoreHealth {
            backend: "memory",
            version: None,
            schema: None,
            host: None,
        })
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn get_subscription(&self, id: Uuid) -> Result<Option<Subscription>, CatalogError> {
        Ok(self.subscriptions.get(&id).map(|s| s.value().clone()))
    }

    async fn find_active_subscription(
        &self,
        user_id: &str,
        agent_id: Uuid,
    ) -> Result<Option<Subscription>, CatalogError> {
        Ok(self
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id && s.agent_id == agent_id && s.is_active())
            .min_by_key(|s| s.created_at)
            .map(|s| s.value().clone()))
    }

    async fn create_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, CatalogError> {
        if !self.agents.contains_key(&subscription.agent_id) {
            return Err(CatalogError::AgentNotFound);
        }
        self.subscriptions
            .insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn update_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, CatalogError> {
        let mut stored = self
            .subscriptions
            .get_mut(&subscription.id)
            .ok_or(CatalogError::SubscriptionNotFound)?;
        *stored = subscription;
        Ok(stored.clone())
    }

    async fn user_subscriptions(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserSubscription>, CatalogError> {
        let mut active: Vec<Subscription> = self
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id && s.is_active())
            .map(|s| s.value().clone())
            .collect();
        active.sort_by_key(|s| s.created_at);

        Ok(active
            .into_iter()
            .filter_map(|s| {
                let agent = self.agents.get(&s.agent_id)?;
                Some(UserSubscription {
                    id: s.id,
                    agent_id: agent.id,
                    agent_name: agent.name.clone(),
                    agent_title: agent.title.clone(),
                    agent_description: agent.description.clone(),
                    agent_image_url: agent.image_url.clone(),
                    purchase_modality: s.purchase_modality,
                    purchase_date: s.purchase_date,
                    expiry_date: s.expiry_date,
                    ownership_status: s.ownership_status,
                    created_at: s.created_at,
                    updated_at: s.updated_at,
                })
            })
            .collect())
    }
}
