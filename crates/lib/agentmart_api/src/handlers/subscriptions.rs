//! Subscription request handlers. All routes run behind `require_auth`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use agentmart_core::models::subscription::{NewSubscription, Subscription, UserSubscription};

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::auth::AuthenticatedUser;
use crate::services::subscriptions as service;

/// `POST /api/v1/subscriptions/subscribe`
pub async fn subscribe_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<NewSubscription>,
) -> AppResult<(StatusCode, Json<Subscription>)> {
    let subscription = service::subscribe(
        state.agents.as_ref(),
        state.subscriptions.as_ref(),
        &user.0.id,
        body,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// `POST /api/v1/subscriptions/unsubscribe/{subscription_id}`
pub async fn unsubscribe_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(subscription_id): ApiPath<Uuid>,
) -> AppResult<Json<Subscription>> {
    let subscription =
        service::unsubscribe(state.subscriptions.as_ref(), &user.0.id, subscription_id).await?;
    Ok(Json(subscription))
}

/// `GET /api/v1/subscriptions/user-subscriptions`: the caller's active
/// subscriptions with agent details.
pub async fn user_subscriptions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<Vec<UserSubscription>>> {
    Ok(Json(
        service::user_subscriptions(state.subscriptions.as_ref(), &user.0.id).await?,
    ))
}
