//! API server configuration.

use std::str::FromStr;

use agentmart_core::auth::cache::DEFAULT_CAPACITY;
use agentmart_core::auth::clerk::{DEFAULT_API_URL, DEFAULT_TIMEOUT};
use thiserror::Error;

/// Configuration could not be assembled from the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8000").
    pub bind_addr: String,
    /// PostgreSQL connection URL. Unused by the in-memory store.
    pub database_url: String,
    /// PEM-encoded RSA public key that session tokens are verified against.
    pub clerk_jwt_key: String,
    /// Secret key for the identity provider's backend API.
    pub clerk_secret_key: String,
    pub clerk_api_url: String,
    pub identity_cache_capacity: u64,
    pub provider_timeout_secs: u64,
    /// Require the token's provider session to be active.
    pub verify_sessions: bool,
    /// Role required to create, update or delete agents.
    pub agent_admin_role: String,
    /// Permission (`org:<feature>:<action>`) required to create, update or
    /// delete agents.
    pub agent_write_permission: String,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable                  | Default                        |
    /// |---------------------------|--------------------------------|
    /// | `BIND_ADDR`               | `127.0.0.1:8000`               |
    /// | `DATABASE_URL`            | `postgres://localhost:5432/agentmart` |
    /// | `CLERK_JWT_KEY`           | required                       |
    /// | `CLERK_SECRET_KEY`        | required                       |
    /// | `CLERK_API_URL`           | `https://api.clerk.com/v1`     |
    /// | `IDENTITY_CACHE_CAPACITY` | `100`                          |
    /// | `PROVIDER_TIMEOUT_SECS`   | `10`                           |
    /// | `VERIFY_SESSIONS`         | `false`                        |
    /// | `AGENT_ADMIN_ROLE`        | `admin`                        |
    /// | `AGENT_WRITE_PERMISSION`  | `org:all_content:manage`       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8000".into()),
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost:5432/agentmart".into()),
            clerk_jwt_key: required("CLERK_JWT_KEY")?,
            clerk_secret_key: required("CLERK_SECRET_KEY")?,
            clerk_api_url: get("CLERK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
            identity_cache_capacity: parse_or(
                "IDENTITY_CACHE_CAPACITY",
                get("IDENTITY_CACHE_CAPACITY"),
                DEFAULT_CAPACITY,
            )?,
            provider_timeout_secs: parse_or(
                "PROVIDER_TIMEOUT_SECS",
                get("PROVIDER_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT.as_secs(),
            )?,
            verify_sessions: parse_or("VERIFY_SESSIONS", get("VERIFY_SESSIONS"), false)?,
            agent_admin_role: get("AGENT_ADMIN_ROLE").unwrap_or_else(|| "admin".into()),
            agent_write_permission: get("AGENT_WRITE_PERMISSION")
                .unwrap_or_else(|| "org:all_content:manage".into()),
        })
    }
}

fn parse_or<T: FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
