use std::sync::Arc;

use askama::Template;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    application::{
        mail::OutgoingMail,
        newsletter::{NewsletterQueue, NewsletterTask},
        repos::{InquiriesRepo, RepoError},
    },
    domain::{entities::InquiryRecord, error::DomainError, subscribers::normalize_email},
};

#[derive(Debug, Error)]
pub enum InquiryError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct SubmitInquiryCommand {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub message: String,
}

/// Where inquiry notifications go and who sends them.
#[derive(Debug, Clone)]
pub struct InquiryNotifications {
    pub from: String,
    pub to: Option<String>,
}

#[derive(Template)]
#[template(path = "email/inquiry.txt")]
struct InquiryText<'a> {
    name: &'a str,
    email: &'a str,
    company: &'a str,
    message: &'a str,
}

#[derive(Clone)]
pub struct InquiryService {
    inquiries: Arc<dyn InquiriesRepo>,
    queue: NewsletterQueue,
    notifications: InquiryNotifications,
}

impl InquiryService {
    pub fn new(
        inquiries: Arc<dyn InquiriesRepo>,
        queue: NewsletterQueue,
        notifications: InquiryNotifications,
    ) -> Self {
        Self {
            inquiries,
            queue,
            notifications,
        }
    }

    pub async fn submit(
        &self,
        command: SubmitInquiryCommand,
    ) -> Result<InquiryRecord, InquiryError> {
        DomainError::require(&command.name, "name")?;
        DomainError::require(&command.message, "message")?;
        let email = normalize_email(&command.email)?;

        let record = InquiryRecord {
            id: Uuid::new_v4(),
            name: command.name.trim().to_string(),
            email,
            company: command
                .company
                .map(|company| company.trim().to_string())
                .filter(|company| !company.is_empty()),
            message: command.message.trim().to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.inquiries.insert_inquiry(record.clone()).await?;

        info!(
            target = "tidings::inquiries",
            inquiry_id = %record.id,
            "inquiry stored"
        );
        self.notify(&record);

        Ok(record)
    }

    fn notify(&self, record: &InquiryRecord) {
        let Some(to) = self.notifications.to.clone() else {
            return;
        };

        let body = InquiryText {
            name: &record.name,
            email: &record.email,
            company: record.company.as_deref().unwrap_or("-"),
            message: &record.message,
        }
        .render();

        match body {
            Ok(text) => {
                self.queue.enqueue(NewsletterTask::Notify(OutgoingMail {
                    to,
                    from: self.notifications.from.clone(),
                    subject: format!("New inquiry from {}", record.name),
                    text,
                    html: None,
                }));
            }
            Err(err) => warn!(
                target = "tidings::inquiries",
                inquiry_id = %record.id,
                error = %err,
                "failed to render inquiry notification"
            ),
        }
    }
}
