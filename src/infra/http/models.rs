//! Request and response bodies for the JSON endpoints.

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::{
    content::{ContentPatch, CreateContentCommand},
    inquiries::SubmitInquiryCommand,
    subscriptions::SubscribeCommand,
};
use crate::domain::{
    entities::{ContentRecord, FileRecord, InquiryRecord, SubscriberRecord},
    types::ContentKind,
};

/// Missing fields deserialize as empty so the service reports them as
/// validation errors.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubscribeRequest {
    pub name: String,
    pub email: String,
    pub categories: Vec<String>,
}

impl From<SubscribeRequest> for SubscribeCommand {
    fn from(request: SubscribeRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
            categories: request.categories,
        }
    }
}

/// Subscriber as returned to the public. The unsubscribe token is never echoed.
#[derive(Debug, Serialize)]
pub struct SubscriberResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub categories: Vec<String>,
    pub subscribed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<SubscriberRecord> for SubscriberResponse {
    fn from(record: SubscriberRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            name: record.name,
            categories: record.categories,
            subscribed: record.subscribed,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InquiryRequest {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub message: String,
}

impl From<InquiryRequest> for SubmitInquiryCommand {
    fn from(request: InquiryRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
            company: request.company,
            message: request.message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InquiryResponse {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<InquiryRecord> for InquiryResponse {
    fn from(record: InquiryRecord) -> Self {
        Self {
            id: record.id,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContentCreateRequest {
    pub title: String,
    pub excerpt: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub published: Option<bool>,
    pub file_id: Option<Uuid>,
}

impl From<ContentCreateRequest> for CreateContentCommand {
    fn from(request: ContentCreateRequest) -> Self {
        Self {
            title: request.title,
            excerpt: request.excerpt,
            short_description: request.short_description,
            description: request.description,
            published_at: request.published_at,
            published: request.published,
            file_id: request.file_id,
        }
    }
}

/// Partial update. Absent fields stay untouched; `null` clears nullable ones.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContentPatchRequest {
    pub title: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub excerpt: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub short_description: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(deserialize_with = "nullable_timestamp")]
    pub published_at: Option<Option<OffsetDateTime>>,
    pub published: Option<bool>,
    #[serde(deserialize_with = "nullable")]
    pub file_id: Option<Option<Uuid>>,
}

impl From<ContentPatchRequest> for ContentPatch {
    fn from(request: ContentPatchRequest) -> Self {
        Self {
            title: request.title,
            excerpt: request.excerpt,
            short_description: request.short_description,
            description: request.description,
            published_at: request.published_at,
            published: request.published,
            file_id: request.file_id,
        }
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn nullable_timestamp<'de, D>(deserializer: D) -> Result<Option<Option<OffsetDateTime>>, D::Error>
where
    D: Deserializer<'de>,
{
    time::serde::rfc3339::option::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub id: Uuid,
    pub kind: ContentKind,
    pub title: String,
    pub excerpt: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub published: bool,
    pub file_id: Option<Uuid>,
    pub download_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ContentRecord> for ContentResponse {
    fn from(record: ContentRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            title: record.title,
            excerpt: record.excerpt,
            short_description: record.short_description,
            description: record.description,
            published_at: record.published_at,
            published: record.published,
            file_id: record.file_id,
            download_count: record.download_count,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: Uuid,
    pub name: String,
    pub mime: Option<String>,
    pub size_bytes: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            mime: record.mime,
            size_bytes: record.size_bytes,
            created_at: record.created_at,
        }
    }
}
