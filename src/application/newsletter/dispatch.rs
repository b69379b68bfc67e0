//! Concurrent per-recipient delivery.

use std::sync::Arc;

use futures::future::join_all;
use metrics::counter;
use tracing::{info, warn};

use crate::{
    application::mail::{Mailer, OutgoingMail},
    domain::{entities::SubscriberRecord, types::ContentKind},
};

use super::render::RenderedNewsletter;

/// Aggregated outcome of one fan-out batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct FanOutDispatcher {
    mailer: Arc<dyn Mailer>,
    from: String,
}

impl FanOutDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
        }
    }

    /// Send one personalised copy per recipient and wait for every attempt.
    ///
    /// Failures are logged and counted; they never abort sibling sends.
    pub async fn dispatch(
        &self,
        kind: ContentKind,
        newsletter: &RenderedNewsletter,
        recipients: &[SubscriberRecord],
    ) -> DispatchReport {
        let sends = recipients.iter().map(|recipient| {
            let personalized = newsletter.personalize(&recipient.unsubscribe_token);
            let mail = OutgoingMail {
                to: recipient.email.clone(),
                from: self.from.clone(),
                subject: personalized.subject,
                text: personalized.text,
                html: Some(personalized.html),
            };
            let mailer = Arc::clone(&self.mailer);
            async move { (recipient.email.as_str(), mailer.send(mail).await) }
        });

        let mut report = DispatchReport {
            attempted: recipients.len(),
            ..DispatchReport::default()
        };

        for (recipient, outcome) in join_all(sends).await {
            match outcome {
                Ok(()) => {
                    report.delivered += 1;
                    counter!("tidings_newsletter_sent_total", "kind" => kind.as_str())
                        .increment(1);
                }
                Err(err) => {
                    report.failed += 1;
                    counter!("tidings_newsletter_failed_total", "kind" => kind.as_str())
                        .increment(1);
                    warn!(
                        target = "tidings::newsletter::dispatch",
                        recipient,
                        content_kind = kind.as_str(),
                        outcome = "failed",
                        error = %err,
                        "newsletter delivery failed"
                    );
                }
            }
        }

        info!(
            target = "tidings::newsletter::dispatch",
            content_kind = kind.as_str(),
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            "newsletter batch settled"
        );

        report
    }
}
