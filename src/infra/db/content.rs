use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{ContentRepo, CreateContentParams, RepoError, UpdateContentParams},
    domain::{entities::ContentRecord, types::ContentKind},
};

use super::{PostgresRepositories, map_sqlx_error};

const CONTENT_COLUMNS: &str = "id, kind, title, excerpt, short_description, description, \
     published_at, published, file_id, download_count, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ContentRow {
    id: Uuid,
    kind: ContentKind,
    title: String,
    excerpt: Option<String>,
    short_description: Option<String>,
    description: Option<String>,
    published_at: Option<OffsetDateTime>,
    published: bool,
    file_id: Option<Uuid>,
    download_count: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ContentRow> for ContentRecord {
    fn from(row: ContentRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            title: row.title,
            excerpt: row.excerpt,
            short_description: row.short_description,
            description: row.description,
            published_at: row.published_at,
            published: row.published,
            file_id: row.file_id,
            download_count: row.download_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Split a patch field into "was submitted" and the value to store.
fn patch<T>(field: Option<Option<T>>) -> (bool, Option<T>) {
    match field {
        Some(value) => (true, value),
        None => (false, None),
    }
}

#[async_trait]
impl ContentRepo for PostgresRepositories {
    async fn find_content(&self, id: Uuid) -> Result<Option<ContentRecord>, RepoError> {
        let sql = format!("SELECT {CONTENT_COLUMNS} FROM content_items WHERE id = $1");
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ContentRecord::from))
    }

    async fn create_content(
        &self,
        params: CreateContentParams,
    ) -> Result<ContentRecord, RepoError> {
        let sql = format!(
            "INSERT INTO content_items \
             (id, kind, title, excerpt, short_description, description, published_at, published, file_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {CONTENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.kind)
            .bind(&params.title)
            .bind(&params.excerpt)
            .bind(&params.short_description)
            .bind(&params.description)
            .bind(params.published_at)
            .bind(params.published)
            .bind(params.file_id)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_content(
        &self,
        params: UpdateContentParams,
    ) -> Result<Option<ContentRecord>, RepoError> {
        let (set_excerpt, excerpt) = patch(params.excerpt);
        let (set_short, short_description) = patch(params.short_description);
        let (set_description, description) = patch(params.description);
        let (set_published_at, published_at) = patch(params.published_at);
        let (set_file, file_id) = patch(params.file_id);

        let sql = format!(
            "UPDATE content_items SET \
             title = COALESCE($3, title), \
             excerpt = CASE WHEN $4 THEN $5 ELSE excerpt END, \
             short_description = CASE WHEN $6 THEN $7 ELSE short_description END, \
             description = CASE WHEN $8 THEN $9 ELSE description END, \
             published_at = CASE WHEN $10 THEN $11 ELSE published_at END, \
             published = COALESCE($12, published), \
             file_id = CASE WHEN $13 THEN $14 ELSE file_id END, \
             updated_at = now() \
             WHERE id = $1 AND kind = $2 \
             RETURNING {CONTENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(params.id)
            .bind(params.kind)
            .bind(&params.title)
            .bind(set_excerpt)
            .bind(&excerpt)
            .bind(set_short)
            .bind(&short_description)
            .bind(set_description)
            .bind(&description)
            .bind(set_published_at)
            .bind(published_at)
            .bind(params.published)
            .bind(set_file)
            .bind(file_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ContentRecord::from))
    }

    async fn increment_download_count(&self, id: Uuid) -> Result<i64, RepoError> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE content_items SET download_count = download_count + 1 \
             WHERE id = $1 RETURNING download_count",
        )
        .bind(id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
