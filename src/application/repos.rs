//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{ContentRecord, FileRecord, InquiryRecord, SubscriberRecord};
use crate::domain::types::ContentKind;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateSubscriberParams {
    pub email: String,
    pub name: String,
    pub categories: Vec<String>,
    pub unsubscribe_token: String,
}

#[derive(Debug, Clone)]
pub struct UpdateSubscriberParams {
    pub id: Uuid,
    pub name: String,
    pub categories: Vec<String>,
    pub subscribed: bool,
}

#[async_trait]
pub trait SubscribersRepo: Send + Sync {
    /// Every row with `subscribed = true`.
    async fn list_subscribed(&self) -> Result<Vec<SubscriberRecord>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<SubscriberRecord>, RepoError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<SubscriberRecord>, RepoError>;

    async fn create_subscriber(
        &self,
        params: CreateSubscriberParams,
    ) -> Result<SubscriberRecord, RepoError>;

    async fn update_subscriber(
        &self,
        params: UpdateSubscriberParams,
    ) -> Result<SubscriberRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateContentParams {
    pub kind: ContentKind,
    pub title: String,
    pub excerpt: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<OffsetDateTime>,
    pub published: bool,
    pub file_id: Option<Uuid>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone)]
pub struct UpdateContentParams {
    pub id: Uuid,
    pub kind: ContentKind,
    pub title: Option<String>,
    pub excerpt: Option<Option<String>>,
    pub short_description: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub published_at: Option<Option<OffsetDateTime>>,
    pub published: Option<bool>,
    pub file_id: Option<Option<Uuid>>,
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    async fn find_content(&self, id: Uuid) -> Result<Option<ContentRecord>, RepoError>;

    async fn create_content(&self, params: CreateContentParams)
    -> Result<ContentRecord, RepoError>;

    /// Returns `None` when no item of the given kind has this id.
    async fn update_content(
        &self,
        params: UpdateContentParams,
    ) -> Result<Option<ContentRecord>, RepoError>;

    /// Atomically add one to `download_count`, returning the new value.
    async fn increment_download_count(&self, id: Uuid) -> Result<i64, RepoError>;
}

#[async_trait]
pub trait FilesRepo: Send + Sync {
    async fn insert_file(&self, record: FileRecord) -> Result<(), RepoError>;

    async fn find_file(&self, id: Uuid) -> Result<Option<FileRecord>, RepoError>;
}

#[async_trait]
pub trait InquiriesRepo: Send + Sync {
    async fn insert_inquiry(&self, record: InquiryRecord) -> Result<(), RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
