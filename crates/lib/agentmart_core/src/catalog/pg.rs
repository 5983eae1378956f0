//! Postgres-backed catalog and subscription store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{CatalogError, CatalogStore, StoreHealth, SubscriptionStore};
use crate::models::agent::{Agent, AgentFilter, Page};
use crate::models::subscription::{Subscription, UserSubscription};

/// Columns for single-agent reads, including the image bytes.
const AGENT_COLUMNS: &str = "id, name, title, description, version, features, status, \
     pricing_model, price, display_order, provider, language_support, tags, image_url, \
     demo_url, prod_url, image_data, created_at, updated_at";

/// Columns for list reads; image bytes are only served by the image endpoint.
const AGENT_LIST_COLUMNS: &str = "id, name, title, description, version, features, status, \
     pricing_model, price, display_order, provider, language_support, tags, image_url, \
     demo_url, prod_url, NULL::bytea AS image_data, created_at, updated_at";

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, agent_id, purchase_modality, purchase_date, \
     expiry_date, ownership_status, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
struct AgentRow {
    id: Uuid,
    name: String,
    title: String,
    description: String,
    version: String,
    features: String,
    status: String,
    pricing_model: String,
    price: Option<f64>,
    display_order: i32,
    provider: String,
    language_support: Vec<String>,
    tags: Vec<String>,
    image_url: Option<String>,
    demo_url: Option<String>,
    prod_url: Option<String>,
    image_data: Option<Vec<u8>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AgentRow> for Agent {
    type Error = CatalogError;

    fn try_from(row: AgentRow) -> Result<Self, Self::Error> {
        Ok(Agent {
            id: row.id,
            name: row.name,
            title: row.title,
            description: row.description,
            version: row.version,
            features: row.features,
            status: row.status.parse()?,
            pricing_model: row.pricing_model.parse()?,
            price: row.price,
            display_order: row.display_order,
            provider: row.provider,
            language_support: row.language_support,
            tags: row.tags,
            image_url: row.image_url,
            demo_url: row.demo_url,
            prod_url: row.prod_url,
            image_data: row.image_data,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    agent_id: Uuid,
    purchase_modality: String,
    purchase_date: Option<DateTime<Utc>>,
    expiry_date: Option<DateTime<Utc>>,
    ownership_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = CatalogError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: row.id,
            user_id: row.user_id,
            agent_id: row.agent_id,
            purchase_modality: row.purchase_modality,
            purchase_date: row.purchase_date,
            expiry_date: row.expiry_date,
            ownership_status: row.ownership_status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct UserSubscriptionRow {
    id: Uuid,
    agent_id: Uuid,
    agent_name: String,
    agent_title: String,
    agent_description: String,
    agent_image_url: Option<String>,
    purchase_modality: String,
    purchase_date: Option<DateTime<Utc>>,
    expiry_date: Option<DateTime<Utc>>,
    ownership_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserSubscriptionRow> for UserSubscription {
    type Error = CatalogError;

    fn try_from(row: UserSubscriptionRow) -> Result<Self, Self::Error> {
        Ok(UserSubscription {
            id: row.id,
            agent_id: row.agent_id,
            agent_name: row.agent_name,
            agent_title: row.agent_title,
            agent_description: row.agent_description,
            agent_image_url: row.agent_image_url,
            purchase_modality: row.purchase_modality,
            purchase_date: row.purchase_date,
            expiry_date: row.expiry_date,
            ownership_status: row.ownership_status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Map a unique-constraint violation on the agent name to a domain error.
fn map_write_error(err: sqlx::Error) -> CatalogError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => CatalogError::DuplicateName,
        _ => CatalogError::Database(err),
    }
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, CatalogError>
where
    T: TryFrom<R, Error = CatalogError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Catalog and subscription store over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_agents(&self, filter: &AgentFilter) -> Result<Vec<Agent>, CatalogError> {
        let rows = sqlx::query_as::<_, AgentRow>(&format!(
            r#"
            SELECT {AGENT_LIST_COLUMNS}
            FROM agents
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR pricing_model = $2)
            ORDER BY display_order, name
            OFFSET $3 LIMIT $4
            "#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.pricing_model.map(|p| p.as_str()))
        .bind(filter.page.skip)
        .bind(filter.page.limit)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn search_agents(&self, query: &str, page: Page) -> Result<Vec<Agent>, CatalogError> {
        let rows = sqlx::query_as::<_, AgentRow>(&format!(
            r#"
            SELECT {AGENT_LIST_COLUMNS}
            FROM agents
            WHERE strpos(lower(name), lower($1)) > 0
               OR strpos(lower(description), lower($1)) > 0
            ORDER BY display_order, name
            OFFSET $2 LIMIT $3
            "#
        ))
        .bind(query)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn get_agent(&self, id: Uuid) -> Result<Option<Agent>, CatalogError> {
        sqlx::query_as::<_, AgentRow>(&format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Agent::try_from)
            .transpose()
    }

    async fn get_agent_image(&self, id: Uuid) -> Result<Option<Vec<u8>>, CatalogError> {
        let image = sqlx::query_scalar::<_, Option<Vec<u8>>>(
            "SELECT image_data FROM agents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(image.flatten())
    }

    async fn agent_name_exists(&self, name: &str) -> Result<bool, CatalogError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM agents WHERE name = $1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_agent(&self, agent: Agent) -> Result<Agent, CatalogError> {
        let row = sqlx::query_as::<_, AgentRow>(&format!(
            r#"
            INSERT INTO agents (
                id, name, title, description, version, features, status, pricing_model,
                price, display_order, provider, language_support, tags, image_url,
                demo_url, prod_url, image_data, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING {AGENT_COLUMNS}
            "#
        ))
        .bind(agent.id)
        .bind(&agent.name)
        .bind(&agent.title)
        .bind(&agent.description)
        .bind(&agent.version)
        .bind(&agent.features)
        .bind(agent.status.as_str())
        .bind(agent.pricing_model.as_str())
        .bind(agent.price)
        .bind(agent.display_order)
        .bind(&agent.provider)
        .bind(&agent.language_support)
        .bind(&agent.tags)
        .bind(&agent.image_url)
        .bind(&agent.demo_url)
        .bind(&agent.prod_url)
        .bind(&agent.image_data)
        .bind(agent.created_at)
        .bind(agent.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        row.try_into()
    }

    async fn update_agent(&self, agent: Agent) -> Result<Agent, CatalogError> {
        let row = sqlx::query_as::<_, AgentRow>(&format!(
            r#"
            UPDATE agents SET
                name = $2, title = $3, description = $4, version = $5, features = $6,
                status = $7, pricing_model = $8, price = $9, display_order = $10,
                provider = $11, language_support = $12, tags = $13, image_url = $14,
                demo_url = $15, prod_url = $16, updated_at = $17
            WHERE id = $1
            RETURNING {AGENT_COLUMNS}
            "#
        ))
        .bind(agent.id)
        .bind(&agent.name)
        .bind(&agent.title)
        .bind(&agent.description)
        .bind(&agent.version)
        .bind(&agent.features)
        .bind(agent.status.as_str())
        .bind(agent.pricing_model.as_str())
        .bind(agent.price)
        .bind(agent.display_order)
        .bind(&agent.provider)
        .bind(&agent.language_support)
        .bind(&agent.tags)
        .bind(&agent.image_url)
        .bind(&agent.demo_url)
        .bind(&agent.prod_url)
        .bind(agent.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;
        row.ok_or(CatalogError::AgentNotFound)?.try_into()
    }

    async fn delete_agent(&self, id: Uuid) -> Result<bool, CatalogError> {
        // Subscriptions go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM agents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health(&self) -> Result<StoreHealth, CatalogError> {
        let (version, schema) =
            sqlx::query_as::<_, (String, String)>("SELECT version(), current_schema()")
                .fetch_one(&self.pool)
                .await?;
        let host = self
            .pool
            .connect_options()
            .get_host()
            .to_string();
        Ok(StoreHealth {
            backend: "postgres",
            version: Some(version),
            schema: Some(schema),
            host: Some(host),
        })
    }
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn get_subscription(&self, id: Uuid) -> Result<Option<Subscription>, CatalogError> {
        sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM user_agent_purchases WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Subscription::try_from)
        .transpose()
    }

    async fn find_active_subscription(
        &self,
        user_id: &str,
        agent_id: Uuid,
    ) -> Result<Option<Subscription>, CatalogError> {
        sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}
            FROM user_agent_purchases
            WHERE user_id = $1 AND agent_id = $2 AND ownership_status = 'active'
            ORDER BY created_at
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Subscription::try_from)
        .transpose()
    }

    async fn create_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, CatalogError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            INSERT INTO user_agent_purchases (
                id, user_id, agent_id, purchase_modality, purchase_date, expiry_date,
                ownership_status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(subscription.id)
        .bind(&subscription.user_id)
        .bind(subscription.agent_id)
        .bind(&subscription.purchase_modality)
        .bind(subscription.purchase_date)
        .bind(subscription.expiry_date)
        .bind(subscription.ownership_status.as_str())
        .bind(subscription.created_at)
        .bind(subscription.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                CatalogError::AgentNotFound
            }
            _ => CatalogError::Database(e),
        })?;
        row.try_into()
    }

    async fn update_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, CatalogError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            UPDATE user_agent_purchases SET
                purchase_modality = $2, purchase_date = $3, expiry_date = $4,
                ownership_status = $5, updated_at = $6
            WHERE id = $1
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(subscription.id)
        .bind(&subscription.purchase_modality)
        .bind(subscription.purchase_date)
        .bind(subscription.expiry_date)
        .bind(subscription.ownership_status.as_str())
        .bind(subscription.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(CatalogError::SubscriptionNotFound)?.try_into()
    }

    async fn user_subscriptions(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserSubscription>, CatalogError> {
        let rows = sqlx::query_as::<_, UserSubscriptionRow>(
            r#"
            SELECT p.id, p.agent_id,
                   a.name AS agent_name, a.title AS agent_title,
                   a.description AS agent_description, a.image_url AS agent_image_url,
                   p.purchase_modality, p.purchase_date, p.expiry_date,
                   p.ownership_status, p.created_at, p.updated_at
            FROM user_agent_purchases p
            JOIN agents a ON a.id = p.agent_id
            WHERE p.user_id = $1 AND p.ownership_status = 'active'
            ORDER BY p.created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }
}
