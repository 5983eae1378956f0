//! Catalog service: validation and name-uniqueness around the agent store.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use agentmart_core::catalog::{CatalogError, CatalogStore};
use agentmart_core::models::agent::{Agent, AgentFilter, AgentUpdate, NewAgent, Page};
use agentmart_core::uuid::new_id;

use crate::error::{AppError, AppResult};

pub async fn list_agents(store: &dyn CatalogStore, filter: &AgentFilter) -> AppResult<Vec<Agent>> {
    Ok(store.list_agents(filter).await?)
}

pub async fn search_agents(store: &dyn CatalogStore, query: &str, page: Page) -> AppResult<Vec<Agent>> {
    if query.is_empty() {
        return Err(AppError::Validation(
            "query must be at least 1 character".into(),
        ));
    }
    Ok(store.search_agents(query, page).await?)
}

pub async fn get_agent(store: &dyn CatalogStore, id: Uuid) -> AppResult<Agent> {
    store
        .get_agent(id)
        .await?
        .ok_or_else(|| CatalogError::AgentNotFound.into())
}

pub async fn get_agent_image(store: &dyn CatalogStore, id: Uuid) -> AppResult<Vec<u8>> {
    store
        .get_agent_image(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Agent image not found".into()))
}

pub async fn create_agent(store: &dyn CatalogStore, new: NewAgent) -> AppResult<Agent> {
    new.validate().map_err(AppError::Validation)?;
    if store.agent_name_exists(&new.name).await? {
        return Err(CatalogError::DuplicateName.into());
    }
    let agent = store.create_agent(new.into_agent(new_id(), Utc::now())).await?;
    info!(agent_id = %agent.id, name = %agent.name, "agent created");
    Ok(agent)
}

pub async fn update_agent(
    store: &dyn CatalogStore,
    id: Uuid,
    update: AgentUpdate,
) -> AppResult<Agent> {
    update.validate().map_err(AppError::Validation)?;
    let mut agent = get_agent(store, id).await?;

    if let Some(name) = update.name.as_deref() {
        if name != agent.name && store.agent_name_exists(name).await? {
            return Err(CatalogError::DuplicateName.into());
        }
    }

    update.apply(&mut agent, Utc::now());
    let agent = store.update_agent(agent).await?;
    info!(agent_id = %agent.id, "agent updated");
    Ok(agent)
}

pub async fn delete_agent(store: &dyn CatalogStore, id: Uuid) -> AppResult<()> {
    if !store.delete_agent(id).await? {
        return Err(CatalogError::AgentNotFound.into());
    }
    info!(agent_id = %id, "agent deleted");
    Ok(())
}
