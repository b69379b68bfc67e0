//! Publish-triggered newsletter pipeline.
//!
//! Lookup subscribers, narrow by category, render once, fan out per
//! recipient. Delivery failures stay inside the batch; only the subscriber
//! lookup and rendering surface as errors.

pub mod dispatch;
pub mod filter;
pub mod queue;
pub mod render;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::{
    application::{
        mail::MailError,
        repos::{ContentRepo, RepoError, SubscribersRepo},
    },
    domain::{entities::ContentRecord, types::ContentKind},
};

pub use dispatch::{DispatchReport, FanOutDispatcher};
pub use queue::{NewsletterQueue, NewsletterTask, NewsletterWorker};
pub use render::{NewsletterLinks, RenderError, RenderedNewsletter};

#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("{kind} item `{id}` not found")]
    ContentNotFound { kind: ContentKind, id: Uuid },
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Mail(#[from] MailError),
}

pub struct NewsletterService {
    subscribers: Arc<dyn SubscribersRepo>,
    content: Arc<dyn ContentRepo>,
    links: NewsletterLinks,
    dispatcher: FanOutDispatcher,
}

impl NewsletterService {
    pub fn new(
        subscribers: Arc<dyn SubscribersRepo>,
        content: Arc<dyn ContentRepo>,
        links: NewsletterLinks,
        dispatcher: FanOutDispatcher,
    ) -> Self {
        Self {
            subscribers,
            content,
            links,
            dispatcher,
        }
    }

    /// Announce `item` to every subscribed reader whose categories match.
    pub async fn broadcast(
        &self,
        kind: ContentKind,
        item: &ContentRecord,
    ) -> Result<DispatchReport, NewsletterError> {
        let subscribers = self.subscribers.list_subscribed().await?;
        let recipients = filter::select_recipients(kind, subscribers);

        if recipients.is_empty() {
            info!(
                target = "tidings::newsletter",
                content_kind = kind.as_str(),
                item_id = %item.id,
                "no subscribers matched; nothing to send"
            );
            return Ok(DispatchReport::default());
        }

        let rendered = render::render_newsletter(kind, item, &self.links)?;
        Ok(self.dispatcher.dispatch(kind, &rendered, &recipients).await)
    }

    /// Load the committed item and announce it.
    pub async fn broadcast_by_id(
        &self,
        kind: ContentKind,
        id: Uuid,
    ) -> Result<DispatchReport, NewsletterError> {
        let item = self
            .content
            .find_content(id)
            .await?
            .filter(|item| item.kind == kind)
            .ok_or(NewsletterError::ContentNotFound { kind, id })?;

        self.broadcast(kind, &item).await
    }
}
