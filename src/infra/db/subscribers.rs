use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        CreateSubscriberParams, RepoError, SubscribersRepo, UpdateSubscriberParams,
    },
    domain::entities::SubscriberRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

const SUBSCRIBER_COLUMNS: &str = "id, email, name, categories, subscribed, unsubscribe_token, \
     created_at, updated_at";

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    name: String,
    categories: Vec<String>,
    subscribed: bool,
    unsubscribe_token: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<SubscriberRow> for SubscriberRecord {
    fn from(row: SubscriberRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            categories: row.categories,
            subscribed: row.subscribed,
            unsubscribe_token: row.unsubscribe_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl SubscribersRepo for PostgresRepositories {
    async fn list_subscribed(&self) -> Result<Vec<SubscriberRecord>, RepoError> {
        let sql = format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE subscribed = TRUE ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, SubscriberRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(SubscriberRecord::from).collect())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<SubscriberRecord>, RepoError> {
        let sql = format!("SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE email = $1");
        let row = sqlx::query_as::<_, SubscriberRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(SubscriberRecord::from))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<SubscriberRecord>, RepoError> {
        let sql =
            format!("SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE unsubscribe_token = $1");
        let row = sqlx::query_as::<_, SubscriberRow>(&sql)
            .bind(token)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(SubscriberRecord::from))
    }

    async fn create_subscriber(
        &self,
        params: CreateSubscriberParams,
    ) -> Result<SubscriberRecord, RepoError> {
        let sql = format!(
            "INSERT INTO subscribers (id, email, name, categories, subscribed, unsubscribe_token) \
             VALUES ($1, $2, $3, $4, TRUE, $5) \
             RETURNING {SUBSCRIBER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SubscriberRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&params.email)
            .bind(&params.name)
            .bind(&params.categories)
            .bind(&params.unsubscribe_token)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_subscriber(
        &self,
        params: UpdateSubscriberParams,
    ) -> Result<SubscriberRecord, RepoError> {
        let sql = format!(
            "UPDATE subscribers \
             SET name = $2, categories = $3, subscribed = $4, updated_at = now() \
             WHERE id = $1 \
             RETURNING {SUBSCRIBER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, SubscriberRow>(&sql)
            .bind(params.id)
            .bind(&params.name)
            .bind(&params.categories)
            .bind(params.subscribed)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}
