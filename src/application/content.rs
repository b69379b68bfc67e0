//! Content lifecycle: create and update items, detect publication, enqueue
//! newsletter fan-out.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    application::{
        newsletter::{
            DispatchReport, NewsletterError, NewsletterQueue, NewsletterService, NewsletterTask,
        },
        repos::{ContentRepo, CreateContentParams, FilesRepo, RepoError, UpdateContentParams},
    },
    domain::{
        entities::ContentRecord,
        error::DomainError,
        publication::{
            PublicationSnapshot, SubmittedPublication, published_on_create, published_on_update,
        },
        types::{ContentKind, PublicationShape},
    },
};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{kind} item `{id}` not found")]
    NotFound { kind: ContentKind, id: Uuid },
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Newsletter(#[from] NewsletterError),
}

#[derive(Debug, Clone, Default)]
pub struct CreateContentCommand {
    pub title: String,
    pub excerpt: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<OffsetDateTime>,
    pub published: Option<bool>,
    pub file_id: Option<Uuid>,
}

/// Submitted fields only. The inner `Option` of nullable fields is an
/// explicit null.
#[derive(Debug, Clone, Default)]
pub struct ContentPatch {
    pub title: Option<String>,
    pub excerpt: Option<Option<String>>,
    pub short_description: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub published_at: Option<Option<OffsetDateTime>>,
    pub published: Option<bool>,
    pub file_id: Option<Option<Uuid>>,
}

impl ContentPatch {
    fn submitted_publication(&self) -> SubmittedPublication {
        SubmittedPublication {
            published_at: self.published_at,
            published: self.published,
        }
    }
}

#[derive(Clone)]
pub struct ContentService {
    content: Arc<dyn ContentRepo>,
    files: Arc<dyn FilesRepo>,
    queue: NewsletterQueue,
    newsletter: Arc<NewsletterService>,
}

impl ContentService {
    pub fn new(
        content: Arc<dyn ContentRepo>,
        files: Arc<dyn FilesRepo>,
        queue: NewsletterQueue,
        newsletter: Arc<NewsletterService>,
    ) -> Self {
        Self {
            content,
            files,
            queue,
            newsletter,
        }
    }

    pub async fn find(&self, kind: ContentKind, id: Uuid) -> Result<ContentRecord, ContentError> {
        self.content
            .find_content(id)
            .await?
            .filter(|item| item.kind == kind)
            .ok_or(ContentError::NotFound { kind, id })
    }

    pub async fn create(
        &self,
        kind: ContentKind,
        command: CreateContentCommand,
    ) -> Result<ContentRecord, ContentError> {
        DomainError::require(&command.title, "title")?;
        check_publication_fields(kind, command.published_at.is_some(), command.published.is_some())?;
        self.check_file_reference(kind, command.file_id).await?;

        let params = CreateContentParams {
            kind,
            title: command.title.trim().to_string(),
            excerpt: command.excerpt,
            short_description: command.short_description,
            description: command.description,
            published_at: command.published_at,
            published: command.published.unwrap_or(false),
            file_id: command.file_id,
        };
        let item = self.content.create_content(params).await?;

        if published_on_create(&item.publication()) {
            self.enqueue_broadcast(&item);
        }

        Ok(item)
    }

    pub async fn update(
        &self,
        kind: ContentKind,
        id: Uuid,
        patch: ContentPatch,
    ) -> Result<ContentRecord, ContentError> {
        if let Some(title) = patch.title.as_deref() {
            DomainError::require(title, "title")?;
        }
        check_publication_fields(kind, patch.published_at.is_some(), patch.published.is_some())?;
        if let Some(file_id) = patch.file_id {
            self.check_file_reference(kind, file_id).await?;
        }

        let snapshot = self.before_update(kind, id).await;
        let submitted = patch.submitted_publication();

        let params = UpdateContentParams {
            id,
            kind,
            title: patch.title.map(|title| title.trim().to_string()),
            excerpt: patch.excerpt,
            short_description: patch.short_description,
            description: patch.description,
            published_at: patch.published_at,
            published: patch.published,
            file_id: patch.file_id,
        };
        let item = self
            .content
            .update_content(params)
            .await?
            .ok_or(ContentError::NotFound { kind, id })?;

        self.after_update(&snapshot, &item, &submitted);

        Ok(item)
    }

    /// Re-run the newsletter for an existing item and wait for the batch.
    pub async fn broadcast(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<DispatchReport, ContentError> {
        let item = self.find(kind, id).await?;
        Ok(self.newsletter.broadcast(kind, &item).await?)
    }

    /// Capture publication state before a write. Lookup failures yield an
    /// unavailable snapshot, which later counts as unpublished.
    async fn before_update(&self, kind: ContentKind, id: Uuid) -> PublicationSnapshot {
        match self.content.find_content(id).await {
            Ok(Some(item)) if item.kind == kind => PublicationSnapshot::Captured(item.publication()),
            Ok(_) => {
                warn!(
                    target = "tidings::content",
                    content_kind = kind.as_str(),
                    item_id = %id,
                    "previous publication state not found; treating as unpublished"
                );
                PublicationSnapshot::Unavailable
            }
            Err(err) => {
                warn!(
                    target = "tidings::content",
                    content_kind = kind.as_str(),
                    item_id = %id,
                    error = %err,
                    "previous publication state lookup failed; treating as unpublished"
                );
                PublicationSnapshot::Unavailable
            }
        }
    }

    fn after_update(
        &self,
        snapshot: &PublicationSnapshot,
        item: &ContentRecord,
        submitted: &SubmittedPublication,
    ) {
        if published_on_update(snapshot, &item.publication(), submitted) {
            self.enqueue_broadcast(item);
        }
    }

    fn enqueue_broadcast(&self, item: &ContentRecord) {
        info!(
            target = "tidings::content",
            content_kind = item.kind.as_str(),
            item_id = %item.id,
            "content published; scheduling newsletter"
        );
        self.queue.enqueue(NewsletterTask::Broadcast {
            kind: item.kind,
            item_id: item.id,
        });
    }

    async fn check_file_reference(
        &self,
        kind: ContentKind,
        file_id: Option<Uuid>,
    ) -> Result<(), ContentError> {
        let Some(file_id) = file_id else {
            return Ok(());
        };
        if kind != ContentKind::Resource {
            return Err(DomainError::validation(format!(
                "{kind} items cannot reference a file"
            ))
            .into());
        }
        if self.files.find_file(file_id).await?.is_none() {
            return Err(DomainError::validation(format!(
                "file `{file_id}` has not been uploaded"
            ))
            .into());
        }
        Ok(())
    }
}

/// Reject publication fields that do not belong to the kind's shape.
fn check_publication_fields(
    kind: ContentKind,
    has_published_at: bool,
    has_published: bool,
) -> Result<(), DomainError> {
    match kind.publication_shape() {
        PublicationShape::Timestamp if has_published => Err(DomainError::validation(format!(
            "{kind} items are published through `published_at`"
        ))),
        PublicationShape::Flag if has_published_at => Err(DomainError::validation(format!(
            "{kind} items are published through `published`"
        ))),
        _ => Ok(()),
    }
}
