//! In-process side-effect queue.
//!
//! Request handlers enqueue without waiting; the worker runs each task on its
//! own tokio task so slow batches never hold up later ones. Once every sender
//! is gone the worker waits for the tasks it already started.

use std::sync::Arc;

use metrics::counter;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::{JoinError, JoinHandle, JoinSet},
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    application::mail::{Mailer, OutgoingMail},
    domain::types::ContentKind,
};

use super::{DispatchReport, NewsletterError, NewsletterService};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsletterTask {
    /// Run the newsletter pipeline for a committed content item.
    Broadcast { kind: ContentKind, item_id: Uuid },
    /// Deliver one pre-built message.
    Notify(OutgoingMail),
}

impl NewsletterTask {
    fn label(&self) -> &'static str {
        match self {
            NewsletterTask::Broadcast { .. } => "broadcast",
            NewsletterTask::Notify(_) => "notify",
        }
    }
}

#[derive(Clone)]
pub struct NewsletterQueue {
    sender: mpsc::Sender<NewsletterTask>,
}

impl NewsletterQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<NewsletterTask>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Hand a task to the worker. Returns `false` when the task was dropped.
    pub fn enqueue(&self, task: NewsletterTask) -> bool {
        let label = task.label();
        match self.sender.try_send(task) {
            Ok(()) => {
                info!(
                    target = "tidings::newsletter::queue",
                    task = label,
                    "newsletter task enqueued"
                );
                true
            }
            Err(err) => {
                let reason = match err {
                    TrySendError::Full(_) => "full",
                    TrySendError::Closed(_) => "closed",
                };
                counter!("tidings_queue_dropped_total", "reason" => reason).increment(1);
                warn!(
                    target = "tidings::newsletter::queue",
                    task = label,
                    reason,
                    "newsletter task dropped"
                );
                false
            }
        }
    }
}

pub struct NewsletterWorker {
    service: Arc<NewsletterService>,
    mailer: Arc<dyn Mailer>,
}

impl NewsletterWorker {
    pub fn new(service: Arc<NewsletterService>, mailer: Arc<dyn Mailer>) -> Self {
        Self { service, mailer }
    }

    pub fn spawn(self, receiver: mpsc::Receiver<NewsletterTask>) -> JoinHandle<()> {
        tokio::spawn(self.run(receiver))
    }

    /// Drain the queue until every sender is dropped, then wait for the
    /// tasks still in flight. Started batches are never cancelled here.
    pub async fn run(self, mut receiver: mpsc::Receiver<NewsletterTask>) {
        let worker = Arc::new(self);
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                task = receiver.recv() => match task {
                    Some(task) => {
                        let worker = Arc::clone(&worker);
                        in_flight.spawn(async move { worker.process(task).await });
                    }
                    None => break,
                },
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_join_failure(joined);
                }
            }
        }

        info!(
            target = "tidings::newsletter::queue",
            in_flight = in_flight.len(),
            "newsletter queue closed"
        );
        while let Some(joined) = in_flight.join_next().await {
            log_join_failure(joined);
        }
        info!(
            target = "tidings::newsletter::queue",
            "newsletter worker drained"
        );
    }

    /// Run one task, logging any failure.
    pub async fn process(&self, task: NewsletterTask) {
        let label = task.label();
        if let Err(err) = self.handle(task).await {
            error!(
                target = "tidings::newsletter::queue",
                task = label,
                error = %err,
                "newsletter task failed"
            );
        }
    }

    pub async fn handle(
        &self,
        task: NewsletterTask,
    ) -> Result<Option<DispatchReport>, NewsletterError> {
        match task {
            NewsletterTask::Broadcast { kind, item_id } => self
                .service
                .broadcast_by_id(kind, item_id)
                .await
                .map(Some),
            NewsletterTask::Notify(mail) => {
                let to = mail.to.clone();
                self.mailer.send(mail).await?;
                info!(
                    target = "tidings::newsletter::queue",
                    recipient = %to,
                    "notification delivered"
                );
                Ok(None)
            }
        }
    }
}

fn log_join_failure(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        error!(
            target = "tidings::newsletter::queue",
            error = %err,
            "newsletter task aborted"
        );
    }
}
