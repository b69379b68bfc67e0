use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{FilesRepo, RepoError},
    domain::entities::FileRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct FileRow {
    id: Uuid,
    name: String,
    hash: String,
    ext: String,
    mime: Option<String>,
    size_bytes: i64,
    created_at: OffsetDateTime,
}

impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            hash: row.hash,
            ext: row.ext,
            mime: row.mime,
            size_bytes: row.size_bytes,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl FilesRepo for PostgresRepositories {
    async fn insert_file(&self, record: FileRecord) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO files (id, name, hash, ext, mime, size_bytes, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.hash)
        .bind(&record.ext)
        .bind(&record.mime)
        .bind(record.size_bytes)
        .bind(record.created_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_file(&self, id: Uuid) -> Result<Option<FileRecord>, RepoError> {
        let row = sqlx::query_as::<_, FileRow>(
            "SELECT id, name, hash, ext, mime, size_bytes, created_at FROM files WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(FileRecord::from))
    }
}
