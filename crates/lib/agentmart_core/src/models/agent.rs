//! Agent catalog models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Default page size for list and search.
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// A string did not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Catalog lifecycle status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Inactive,
    Maintenance,
    Deprecated,
    Pending,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Maintenance => "maintenance",
            Self::Deprecated => "deprecated",
            Self::Pending => "pending",
        }
    }
}

impl FromStr for AgentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "maintenance" => Ok(Self::Maintenance),
            "deprecated" => Ok(Self::Deprecated),
            "pending" => Ok(Self::Pending),
            other => Err(UnknownVariant {
                kind: "agent status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an agent is sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingModel {
    Free,
    Paid,
    Subscription,
}

impl PricingModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
            Self::Subscription => "subscription",
        }
    }
}

impl FromStr for PricingModel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "paid" => Ok(Self::Paid),
            "subscription" => Ok(Self::Subscription),
            other => Err(UnknownVariant {
                kind: "pricing model",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PricingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub description: String,
    pub version: String,
    /// Newline-separated feature bullet points.
    pub features: String,
    pub status: AgentStatus,
    pub pricing_model: PricingModel,
    pub price: Option<f64>,
    pub display_order: i32,
    pub provider: String,
    pub language_support: Vec<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub demo_url: Option<String>,
    pub prod_url: Option<String>,
    /// Raw image bytes, served separately from the JSON representation.
    #[serde(skip)]
    pub image_data: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_language_support() -> Vec<String> {
    vec!["en".to_string()]
}

/// Payload for creating an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub title: String,
    pub description: String,
    pub version: String,
    #[serde(default)]
    pub features: String,
    #[serde(default = "NewAgent::default_status")]
    pub status: AgentStatus,
    pub pricing_model: PricingModel,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub display_order: i32,
    pub provider: String,
    #[serde(default = "default_language_support")]
    pub language_support: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub demo_url: Option<String>,
    #[serde(default)]
    pub prod_url: Option<String>,
}

impl NewAgent {
    fn default_status() -> AgentStatus {
        AgentStatus::Active
    }

    /// Check field-level rules, returning a caller-facing message on failure.
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        validate_title(&self.title)?;
        validate_description(&self.description)?;
        validate_version(&self.version)?;
        Ok(())
    }

    /// Materialize into a stored agent with a fresh ID and timestamps.
    pub fn into_agent(self, id: Uuid, now: DateTime<Utc>) -> Agent {
        Agent {
            id,
            name: self.name,
            title: self.title,
            description: self.description,
            version: self.version,
            features: self.features,
            status: self.status,
            pricing_model: self.pricing_model,
            price: self.price,
            display_order: self.display_order,
            provider: self.provider,
            language_support: self.language_support,
            tags: self.tags,
            image_url: self.image_url,
            demo_url: self.demo_url,
            prod_url: self.prod_url,
            image_data: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update: absent (or null) fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub features: Option<String>,
    pub status: Option<AgentStatus>,
    pub pricing_model: Option<PricingModel>,
    pub price: Option<f64>,
    pub display_order: Option<i32>,
    pub provider: Option<String>,
    pub language_support: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub demo_url: Option<String>,
    pub prod_url: Option<String>,
}

impl AgentUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(version) = &self.version {
            validate_version(version)?;
        }
        Ok(())
    }

    /// Apply the supplied fields onto `agent`, bumping `updated_at`.
    pub fn apply(self, agent: &mut Agent, now: DateTime<Utc>) {
        macro_rules! set {
            ($field:ident) => {
                if let Some(v) = self.$field {
                    agent.$field = v;
                }
            };
            ($field:ident, optional) => {
                if let Some(v) = self.$field {
                    agent.$field = Some(v);
                }
            };
        }
        set!(name);
        set!(title);
        set!(description);
        set!(version);
        set!(features);
        set!(status);
        set!(pricing_model);
        set!(price, optional);
        set!(display_order);
        set!(provider);
        set!(language_support);
        set!(tags);
        set!(image_url, optional);
        set!(demo_url, optional);
        set!(prod_url, optional);
        agent.updated_at = now;
    }
}

/// Pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    /// Build a page, rejecting negative offsets and limits outside `1..=100`.
    pub fn new(skip: Option<i64>, limit: Option<i64>) -> Result<Self, String> {
        let skip = skip.unwrap_or(0);
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if skip < 0 {
            return Err("skip must be greater than or equal to 0".into());
        }
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(format!("limit must be between 1 and {MAX_PAGE_LIMIT}"));
        }
        Ok(Self { skip, limit })
    }

    /// Slice an already-ordered result set.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.skip as usize)
            .take(self.limit as usize)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// List filter for the catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentFilter {
    pub status: Option<AgentStatus>,
    pub pricing_model: Option<PricingModel>,
    pub page: Page,
}

impl AgentFilter {
    pub fn matches(&self, agent: &Agent) -> bool {
        self.status.is_none_or(|s| agent.status == s)
            && self.pricing_model.is_none_or(|p| agent.pricing_model == p)
    }
}

/// Catalog list order: `display_order`, then name.
pub fn sort_for_listing(agents: &mut [Agent]) {
    agents.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Case-insensitive match on name or description.
pub fn matches_query(agent: &Agent, query: &str) -> bool {
    let needle = query.to_lowercase();
    agent.name.to_lowercase().contains(&needle)
        || agent.description.to_lowercase().contains(&needle)
}

fn validate_name(name: &str) -> Result<(), String> {
    let len = name.chars().count();
    if len == 0 || len > 100 {
        return Err("name must be between 1 and 100 characters".into());
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), String> {
    let len = title.chars().count();
    if len == 0 || len > 100 {
        return Err("title must be between 1 and 100 characters".into());
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), String> {
    if description.chars().count() < 10 {
        return Err("description must be at least 10 characters".into());
    }
    Ok(())
}

/// `MAJOR.MINOR.PATCH`, digits only.
fn validate_version(version: &str) -> Result<(), String> {
    let parts: Vec<&str> = version.split('.').collect();
    let valid = parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    if !valid {
        return Err(format!(
            "version '{version}' must follow semantic versioning (MAJOR.MINOR.PATCH)"
        ));
    }
    Ok(())
}
