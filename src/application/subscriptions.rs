use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::{
    application::repos::{
        CreateSubscriberParams, RepoError, SubscribersRepo, UpdateSubscriberParams,
    },
    domain::{
        entities::SubscriberRecord,
        error::DomainError,
        subscribers::{generate_unsubscribe_token, normalize_email, parse_categories},
    },
};

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("unsubscribe token not recognised")]
    UnknownToken,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct SubscribeCommand {
    pub name: String,
    pub email: String,
    pub categories: Vec<String>,
}

#[derive(Clone)]
pub struct SubscriptionService {
    subscribers: Arc<dyn SubscribersRepo>,
}

impl SubscriptionService {
    pub fn new(subscribers: Arc<dyn SubscribersRepo>) -> Self {
        Self { subscribers }
    }

    /// Create or refresh the subscriber keyed by email.
    ///
    /// Re-subscribing replaces categories, forces `subscribed` back on and
    /// keeps the original unsubscribe token.
    pub async fn subscribe(
        &self,
        command: SubscribeCommand,
    ) -> Result<SubscriberRecord, SubscriptionError> {
        DomainError::require(&command.name, "name")?;
        let email = normalize_email(&command.email)?;
        let categories = parse_categories(&command.categories)?;
        let name = command.name.trim().to_string();

        if let Some(existing) = self.subscribers.find_by_email(&email).await? {
            return self.resubscribe(existing, name, categories).await;
        }

        let params = CreateSubscriberParams {
            email: email.clone(),
            name: name.clone(),
            categories: categories.clone(),
            unsubscribe_token: generate_unsubscribe_token(),
        };
        match self.subscribers.create_subscriber(params).await {
            Ok(created) => {
                info!(
                    target = "tidings::subscriptions",
                    subscriber_id = %created.id,
                    categories = ?created.categories,
                    "subscriber created"
                );
                Ok(created)
            }
            // A concurrent request inserted the same email first.
            Err(RepoError::Duplicate { .. }) => {
                let existing = self
                    .subscribers
                    .find_by_email(&email)
                    .await?
                    .ok_or(RepoError::NotFound)?;
                self.resubscribe(existing, name, categories).await
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Turn off newsletters for the token holder. The row is kept.
    pub async fn unsubscribe(&self, token: &str) -> Result<SubscriberRecord, SubscriptionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SubscriptionError::UnknownToken);
        }

        let subscriber = self
            .subscribers
            .find_by_token(token)
            .await?
            .ok_or(SubscriptionError::UnknownToken)?;

        if !subscriber.subscribed {
            return Ok(subscriber);
        }

        let updated = self
            .subscribers
            .update_subscriber(UpdateSubscriberParams {
                id: subscriber.id,
                name: subscriber.name,
                categories: subscriber.categories,
                subscribed: false,
            })
            .await?;

        info!(
            target = "tidings::subscriptions",
            subscriber_id = %updated.id,
            "subscriber unsubscribed"
        );
        Ok(updated)
    }

    async fn resubscribe(
        &self,
        existing: SubscriberRecord,
        name: String,
        categories: Vec<String>,
    ) -> Result<SubscriberRecord, SubscriptionError> {
        let updated = self
            .subscribers
            .update_subscriber(UpdateSubscriberParams {
                id: existing.id,
                name,
                categories,
                subscribed: true,
            })
            .await?;

        info!(
            target = "tidings::subscriptions",
            subscriber_id = %updated.id,
            categories = ?updated.categories,
            "subscriber refreshed"
        );
        Ok(updated)
    }
}
