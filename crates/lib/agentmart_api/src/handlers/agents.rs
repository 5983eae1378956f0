//! Agent catalog request handlers.

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde::Deserialize;
use uuid::Uuid;

use agentmart_core::models::agent::{
    Agent, AgentFilter, AgentStatus, AgentUpdate, NewAgent, Page, PricingModel,
};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::services::agents as service;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<AgentStatus>,
    pub pricing_model: Option<PricingModel>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// `GET /api/v1/agents`: filtered, paginated catalog listing.
pub async fn list_agents_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> AppResult<Json<Vec<Agent>>> {
    let filter = AgentFilter {
        status: params.status,
        pricing_model: params.pricing_model,
        page: Page::new(params.skip, params.limit).map_err(AppError::Validation)?,
    };
    Ok(Json(service::list_agents(state.agents.as_ref(), &filter).await?))
}

/// `GET /api/v1/agents/search`: search by name or description.
pub async fn search_agents_handler(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> AppResult<Json<Vec<Agent>>> {
    let page = Page::new(params.skip, params.limit).map_err(AppError::Validation)?;
    let agents = service::search_agents(state.agents.as_ref(), &params.query, page).await?;
    Ok(Json(agents))
}

/// `GET /api/v1/agents/{id}`
pub async fn get_agent_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Agent>> {
    Ok(Json(service::get_agent(state.agents.as_ref(), id).await?))
}

/// `GET /api/v1/agents/{id}/image`: raw image bytes.
pub async fn get_agent_image_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<impl IntoResponse> {
    let bytes = service::get_agent_image(state.agents.as_ref(), id).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}

/// `POST /api/v1/agents`: create an agent.
pub async fn create_agent_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewAgent>,
) -> AppResult<(StatusCode, Json<Agent>)> {
    let agent = service::create_agent(state.agents.as_ref(), body).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

/// `PUT /api/v1/agents/{id}`: partial update.
pub async fn update_agent_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AgentUpdate>,
) -> AppResult<Json<Agent>> {
    Ok(Json(
        service::update_agent(state.agents.as_ref(), id, body).await?,
    ))
}

/// `DELETE /api/v1/agents/{id}`
pub async fn delete_agent_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    service::delete_agent(state.agents.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
