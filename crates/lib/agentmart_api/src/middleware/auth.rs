//! Authentication middleware.
//!
//! `require_auth` resolves the bearer token to a caller identity and injects
//! it as [`AuthenticatedUser`]. `require_agent_writer` runs after it on
//! catalog write routes and evaluates the configured role and permission
//! against the token's claims.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use agentmart_core::auth::bearer_token;
use agentmart_core::auth::permissions::check_role_and_permission;
use agentmart_core::models::auth::Identity;

use crate::AppState;
use crate::error::AppError;

/// Resolved caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, resolves the
/// caller and injects `AuthenticatedUser` into request extensions.
///
/// A missing or non-Bearer header is refused with 403 before the token is
/// looked at.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = authorization(request.headers())
        .and_then(bearer_token)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Forbidden("Not authenticated".into()))?
        .to_string();

    let identity = state.resolver.resolve_current_user(&token).await?;
    debug!(user = %identity.id, "authenticated request");

    request.extensions_mut().insert(AuthenticatedUser(identity));
    Ok(next.run(request).await)
}

/// Axum middleware: requires the configured agent admin role and write
/// permission. Must run inside [`require_auth`].
pub async fn require_agent_writer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let caller = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| &user.0);

    check_role_and_permission(
        state.resolver.verifier(),
        authorization(request.headers()),
        caller,
        &state.config.agent_admin_role,
        &state.config.agent_write_permission,
    )?;

    Ok(next.run(request).await)
}
