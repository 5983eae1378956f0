//! Agentmart API server binary.
//!
//! Reads configuration from the environment (and `.env`), connects the
//! catalog store and serves the REST API until interrupted.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use url::Url;

use agentmart_api::AppState;
use agentmart_api::config::ApiConfig;
use agentmart_core::auth::cache::IdentityCache;
use agentmart_core::auth::clerk::ClerkProvider;
use agentmart_core::auth::jwt::TokenVerifier;
use agentmart_core::auth::resolver::IdentityResolver;
use agentmart_core::catalog::memory::MemoryStore;
use agentmart_core::catalog::pg::PgStore;

/// CLI arguments. Everything not listed here comes from the environment;
/// see `ApiConfig::from_env`.
#[derive(Parser, Debug)]
#[command(name = "agentmart_server", about = "Agentmart API server")]
struct Args {
    /// Address to listen on. Overrides `BIND_ADDR`.
    #[arg(long)]
    bind: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,

    /// Keep the catalog in memory instead of PostgreSQL. Data is lost on exit.
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,agentmart_api=debug,agentmart_core=debug")
            }),
        )
        .init();

    let args = Args::parse();
    let mut config = ApiConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    // Fail fast on a bad key rather than rejecting every request later.
    let verifier = TokenVerifier::from_rsa_pem(&config.clerk_jwt_key)?;
    let provider = ClerkProvider::new(
        Url::parse(&config.clerk_api_url)?,
        config.clerk_secret_key.clone(),
        Duration::from_secs(config.provider_timeout_secs),
    )?;
    let resolver = IdentityResolver::new(
        verifier,
        Arc::new(provider),
        IdentityCache::new(config.identity_cache_capacity),
    )
    .with_session_check(config.verify_sessions);
    let resolver = Arc::new(resolver);

    let state = if args.in_memory {
        warn!("using in-memory store; catalog data will not persist");
        AppState::new(Arc::new(MemoryStore::new()), resolver, config.clone())
    } else {
        info!(max_connections = args.max_connections, "connecting to database");
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.database_url)
            .await?;

        info!("running database migrations");
        agentmart_api::migrate(&pool).await?;

        AppState::new(Arc::new(PgStore::new(pool)), resolver, config.clone())
    };

    let app = agentmart_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
