use async_trait::async_trait;

use crate::{
    application::repos::{InquiriesRepo, RepoError},
    domain::entities::InquiryRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl InquiriesRepo for PostgresRepositories {
    async fn insert_inquiry(&self, record: InquiryRecord) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO inquiries (id, name, email, company, message, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.company)
        .bind(&record.message)
        .bind(record.created_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
