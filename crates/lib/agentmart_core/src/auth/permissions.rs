//! Claims-based role and permission evaluation.
//!
//! A requirement is a role plus an `org:<feature>:<action>` permission. The
//! token carries the three inputs in three places: the role in `o.rol`, the
//! actions in `o.per` and the features in the top-level `fea` claim.
//!
//! Checks run in a fixed order and stop at the first denial: organization
//! data, role, requirement format, features, then feature/action membership.
//! A role mismatch therefore never reveals feature or permission data.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use super::AuthError;
use super::jwt::{TokenError, TokenVerifier};
use super::bearer_token;
use crate::models::auth::{Identity, TokenClaims};

/// A set of claim values parsed from a comma-separated claim string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSet(BTreeSet<String>);

impl ClaimSet {
    /// Split on commas, trimming whitespace and dropping empty entries.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Parse an optional JSON claim. Absent or null yields an empty set; a
    /// non-string value yields `None`.
    fn from_claim(value: Option<&Value>) -> Option<Self> {
        match value {
            None | Some(Value::Null) => Some(Self::default()),
            Some(Value::String(raw)) => Some(Self::parse(raw)),
            Some(_) => None,
        }
    }

    pub fn contains(&self, item: &str) -> bool {
        self.0.contains(item)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for ClaimSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(item)?;
        }
        f.write_str("}")
    }
}

/// A parsed `prefix:feature:action` permission string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequirement {
    pub feature: String,
    pub action: String,
    literal: String,
}

impl PermissionRequirement {
    pub fn parse(literal: &str) -> Result<Self, Denial> {
        let parts: Vec<&str> = literal.split(':').collect();
        match parts.as_slice() {
            [_, feature, action] => Ok(Self {
                feature: (*feature).to_string(),
                action: (*action).to_string(),
                literal: literal.to_string(),
            }),
            _ => Err(Denial::MalformedRequirement(literal.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.literal
    }
}

/// Why a caller was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("No organization data found in token")]
    MissingOrgData,

    #[error("Insufficient role. Required: {required}, Found: {found}")]
    InsufficientRole { required: String, found: String },

    #[error("Invalid permission format: {0}")]
    MalformedRequirement(String),

    #[error("No feature data found in token")]
    MissingFeatureData,

    #[error(
        "Insufficient permissions. Required: {required}. Found features: {features}, permissions: {permissions}"
    )]
    InsufficientPermission {
        required: String,
        features: ClaimSet,
        permissions: ClaimSet,
    },

    #[error("Error checking permissions: claim '{0}' is not a string")]
    MalformedClaim(&'static str),
}

impl Denial {
    /// True when the denial points at a bug in the calling code or the token
    /// issuer's configuration rather than at the caller.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Denial::MalformedRequirement(_) | Denial::MalformedClaim(_)
        )
    }
}

/// Outcome of evaluating a requirement against a token's claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => Err(denial),
        }
    }
}

impl From<Result<(), Denial>> for Decision {
    fn from(result: Result<(), Denial>) -> Self {
        match result {
            Ok(()) => Decision::Allow,
            Err(denial) => Decision::Deny(denial),
        }
    }
}

/// Evaluate `required_role` and `required_permission` against decoded claims.
pub fn evaluate(claims: &TokenClaims, required_role: &str, required_permission: &str) -> Decision {
    run_checks(claims, required_role, required_permission).into()
}

fn run_checks(
    claims: &TokenClaims,
    required_role: &str,
    required_permission: &str,
) -> Result<(), Denial> {
    let org = organization(claims)?;
    check_role(org, required_role)?;

    let requirement = PermissionRequirement::parse(required_permission)?;

    let features = ClaimSet::from_claim(claims.fea.as_ref()).ok_or(Denial::MalformedClaim("fea"))?;
    if features.is_empty() {
        return Err(Denial::MissingFeatureData);
    }
    let permissions = ClaimSet::from_claim(org.get("per")).ok_or(Denial::MalformedClaim("per"))?;

    if features.contains(&requirement.feature) && permissions.contains(&requirement.action) {
        return Ok(());
    }
    Err(Denial::InsufficientPermission {
        required: requirement.literal,
        features,
        permissions,
    })
}

fn organization(claims: &TokenClaims) -> Result<&Map<String, Value>, Denial> {
    claims
        .o
        .as_ref()
        .and_then(Value::as_object)
        .filter(|org| !org.is_empty())
        .ok_or(Denial::MissingOrgData)
}

fn check_role(org: &Map<String, Value>, required_role: &str) -> Result<(), Denial> {
    let found = org.get("rol");
    if found.and_then(Value::as_str) == Some(required_role) {
        return Ok(());
    }
    let found = match found {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(role)) => role.clone(),
        Some(other) => other.to_string(),
    };
    Err(Denial::InsufficientRole {
        required: required_role.to_string(),
        found,
    })
}

/// Full check for a privileged call.
///
/// Requires an already-resolved caller, then re-reads and re-verifies the
/// bearer token from the raw `Authorization` header value before evaluating
/// the requirement.
pub fn check_role_and_permission(
    verifier: &TokenVerifier,
    authorization: Option<&str>,
    caller: Option<&Identity>,
    required_role: &str,
    required_permission: &str,
) -> Result<(), AuthError> {
    let caller = caller.ok_or(AuthError::AuthenticationRequired)?;

    let token = authorization
        .and_then(bearer_token)
        .ok_or(AuthError::InvalidAuthorizationHeader)?;

    let claims = verifier.verify(token).map_err(|e| match e {
        TokenError::Expired => AuthError::TokenExpired,
        other => AuthError::InvalidToken(other.to_string()),
    })?;

    evaluate(&claims, required_role, required_permission)
        .into_result()
        .inspect_err(|denial| {
            debug!(user = %caller.id, required_role, required_permission, %denial, "permission denied");
        })?;
    Ok(())
}
