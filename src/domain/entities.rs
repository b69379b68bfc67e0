//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{
    publication::PublicationState,
    types::{ContentKind, PublicationShape, SummaryField},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriberRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub categories: Vec<String>,
    pub subscribed: bool,
    pub unsubscribe_token: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentRecord {
    pub id: Uuid,
    pub kind: ContentKind,
    pub title: String,
    pub excerpt: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<OffsetDateTime>,
    pub published: bool,
    pub file_id: Option<Uuid>,
    pub download_count: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ContentRecord {
    /// Publication state read through this item's kind-specific shape.
    pub fn publication(&self) -> PublicationState {
        match self.kind.publication_shape() {
            PublicationShape::Timestamp => PublicationState::Timestamp(self.published_at),
            PublicationShape::Flag => PublicationState::Flag(self.published),
        }
    }

    /// Value of a summary field, ignoring blank text.
    pub fn summary_field(&self, field: SummaryField) -> Option<&str> {
        let value = match field {
            SummaryField::Excerpt => self.excerpt.as_deref(),
            SummaryField::ShortDescription => self.short_description.as_deref(),
            SummaryField::Description => self.description.as_deref(),
        };
        value.map(str::trim).filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub name: String,
    pub hash: String,
    pub ext: String,
    pub mime: Option<String>,
    pub size_bytes: i64,
    pub created_at: OffsetDateTime,
}

impl FileRecord {
    /// Storage-relative path, derived from the content hash and extension.
    pub fn stored_path(&self) -> String {
        format!("{}{}", self.hash, self.ext)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InquiryRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub message: String,
    pub created_at: OffsetDateTime,
}
