//! Subscription service.
//!
//! At most one active subscription per (user, agent) is enforced here, at
//! creation time.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use agentmart_core::catalog::{CatalogError, CatalogStore, SubscriptionStore};
use agentmart_core::models::subscription::{NewSubscription, Subscription, UserSubscription};
use agentmart_core::uuid::new_id;

use crate::error::{AppError, AppResult};

/// Subscribe `user_id` to the agent named in `request`.
pub async fn subscribe(
    agents: &dyn CatalogStore,
    subscriptions: &dyn SubscriptionStore,
    user_id: &str,
    request: NewSubscription,
) -> AppResult<Subscription> {
    request.validate().map_err(AppError::Validation)?;
    if agents.get_agent(request.agent_id).await?.is_none() {
        return Err(CatalogError::AgentNotFound.into());
    }
    if subscriptions
        .find_active_subscription(user_id, request.agent_id)
        .await?
        .is_some()
    {
        return Err(CatalogError::AlreadySubscribed.into());
    }

    let subscription = subscriptions
        .create_subscription(request.into_subscription(new_id(), user_id, Utc::now()))
        .await?;
    info!(
        subscription_id = %subscription.id,
        user = user_id,
        agent_id = %subscription.agent_id,
        "subscription created"
    );
    Ok(subscription)
}

/// Unsubscribe the caller from the agent behind `subscription_id`.
///
/// The named subscription only identifies the agent; the caller's active
/// subscription for that agent is the one that gets closed.
pub async fn unsubscribe(
    subscriptions: &dyn SubscriptionStore,
    user_id: &str,
    subscription_id: Uuid,
) -> AppResult<Subscription> {
    let named = subscriptions
        .get_subscription(subscription_id)
        .await?
        .ok_or(CatalogError::SubscriptionNotFound)?;

    if named.user_id != user_id {
        return Err(CatalogError::NotSubscriptionOwner.into());
    }

    let mut active = subscriptions
        .find_active_subscription(user_id, named.agent_id)
        .await?
        .ok_or(CatalogError::SubscriptionNotFound)?;
    active.unsubscribe(Utc::now());

    let updated = subscriptions.update_subscription(active).await?;
    info!(subscription_id = %updated.id, user = user_id, "unsubscribed");
    Ok(updated)
}

pub async fn user_subscriptions(
    subscriptions: &dyn SubscriptionStore,
    user_id: &str,
) -> AppResult<Vec<UserSubscription>> {
    Ok(subscriptions.user_subscriptions(user_id).await?)
}
