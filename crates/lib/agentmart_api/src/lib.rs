//! # agentmart_api
//!
//! HTTP API library for Agentmart.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use agentmart_core::auth::resolver::IdentityResolver;
use agentmart_core::catalog::{DynCatalogStore, DynSubscriptionStore, Store};

use crate::config::ApiConfig;
use crate::handlers::{agents, health, subscriptions};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub agents: DynCatalogStore,
    pub subscriptions: DynSubscriptionStore,
    /// Token verification and caller resolution.
    pub resolver: Arc<IdentityResolver>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Build state over a single backend serving both stores.
    pub fn new<S>(store: Arc<S>, resolver: Arc<IdentityResolver>, config: ApiConfig) -> Self
    where
        S: Store + 'static,
    {
        Self {
            agents: store.clone(),
            subscriptions: store,
            resolver,
            config,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `agentmart_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    agentmart_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route("/api/v1/agents", get(agents::list_agents_handler))
        .route("/api/v1/agents/search", get(agents::search_agents_handler))
        .route("/api/v1/agents/{id}", get(agents::get_agent_handler))
        .route(
            "/api/v1/agents/{id}/image",
            get(agents::get_agent_image_handler),
        );

    // Authenticated routes
    let authenticated = Router::new()
        .route(
            "/api/v1/subscriptions/subscribe",
            post(subscriptions::subscribe_handler),
        )
        .route(
            "/api/v1/subscriptions/unsubscribe/{subscription_id}",
            post(subscriptions::unsubscribe_handler),
        )
        .route(
            "/api/v1/subscriptions/user-subscriptions",
            get(subscriptions::user_subscriptions_handler),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    // Catalog writes. The last `route_layer` runs first, so the caller is
    // resolved before role and permission are checked.
    let privileged = Router::new()
        .route("/api/v1/agents", post(agents::create_agent_handler))
        .route(
            "/api/v1/agents/{id}",
            axum::routing::put(agents::update_agent_handler).delete(agents::delete_agent_handler),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_agent_writer,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(authenticated)
        .merge(privileged)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
