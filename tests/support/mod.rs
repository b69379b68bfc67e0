#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tempfile::TempDir;
use tidings::application::content::ContentService;
use tidings::application::downloads::DownloadService;
use tidings::application::files::FileService;
use tidings::application::inquiries::{InquiryNotifications, InquiryService};
use tidings::application::mail::{MailError, Mailer, OutgoingMail};
use tidings::application::newsletter::{
    FanOutDispatcher, NewsletterLinks, NewsletterQueue, NewsletterService, NewsletterTask,
    NewsletterWorker,
};
use tidings::application::repos::{
    ContentRepo, CreateContentParams, CreateSubscriberParams, FilesRepo, HealthRepo,
    InquiriesRepo, RepoError, SubscribersRepo, UpdateContentParams, UpdateSubscriberParams,
};
use tidings::application::subscriptions::SubscriptionService;
use tidings::domain::entities::{ContentRecord, FileRecord, InquiryRecord, SubscriberRecord};
use tidings::domain::types::ContentKind;
use tidings::infra::files::FileStorage;
use tidings::infra::http::{AdminState, PublicState, build_admin_router, build_public_router};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use url::Url;
use uuid::Uuid;

pub const SITE_URL: &str = "https://example.com/";
pub const FROM: &str = "Tidings <newsletter@example.com>";

/// In-memory stand-in for every repository trait.
#[derive(Default)]
pub struct MemoryStore {
    subscribers: Mutex<Vec<SubscriberRecord>>,
    content: Mutex<HashMap<Uuid, ContentRecord>>,
    files: Mutex<HashMap<Uuid, FileRecord>>,
    inquiries: Mutex<Vec<InquiryRecord>>,
    pub fail_content_lookup: AtomicBool,
    pub fail_subscriber_listing: AtomicBool,
    pub fail_increment: AtomicBool,
    pub fail_ping: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribers(&self) -> Vec<SubscriberRecord> {
        self.subscribers.lock().expect("lock").clone()
    }

    pub fn inquiries(&self) -> Vec<InquiryRecord> {
        self.inquiries.lock().expect("lock").clone()
    }

    pub fn content_item(&self, id: Uuid) -> Option<ContentRecord> {
        self.content.lock().expect("lock").get(&id).cloned()
    }

    pub fn insert_subscriber(
        &self,
        email: &str,
        categories: &[&str],
        subscribed: bool,
    ) -> SubscriberRecord {
        let now = OffsetDateTime::now_utc();
        let record = SubscriberRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            categories: categories.iter().map(|tag| tag.to_string()).collect(),
            subscribed,
            unsubscribe_token: format!("token-{}", Uuid::new_v4().simple()),
            created_at: now,
            updated_at: now,
        };
        self.subscribers.lock().expect("lock").push(record.clone());
        record
    }

    pub fn insert_content(&self, record: ContentRecord) {
        self.content.lock().expect("lock").insert(record.id, record);
    }

    pub fn fail(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }
}

fn failing(flag: &AtomicBool) -> bool {
    flag.load(Ordering::SeqCst)
}

#[async_trait]
impl SubscribersRepo for MemoryStore {
    async fn list_subscribed(&self) -> Result<Vec<SubscriberRecord>, RepoError> {
        if failing(&self.fail_subscriber_listing) {
            return Err(RepoError::Persistence("subscriber store offline".into()));
        }
        Ok(self
            .subscribers
            .lock()
            .expect("lock")
            .iter()
            .filter(|row| row.subscribed)
            .cloned()
            .collect())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<SubscriberRecord>, RepoError> {
        Ok(self
            .subscribers
            .lock()
            .expect("lock")
            .iter()
            .find(|row| row.email == email)
            .cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<SubscriberRecord>, RepoError> {
        Ok(self
            .subscribers
            .lock()
            .expect("lock")
            .iter()
            .find(|row| row.unsubscribe_token == token)
            .cloned())
    }

    async fn create_subscriber(
        &self,
        params: CreateSubscriberParams,
    ) -> Result<SubscriberRecord, RepoError> {
        let mut rows = self.subscribers.lock().expect("lock");
        if rows.iter().any(|row| row.email == params.email) {
            return Err(RepoError::Duplicate {
                constraint: "subscribers_email_key".into(),
            });
        }
        let now = OffsetDateTime::now_utc();
        let record = SubscriberRecord {
            id: Uuid::new_v4(),
            email: params.email,
            name: params.name,
            categories: params.categories,
            subscribed: true,
            unsubscribe_token: params.unsubscribe_token,
            created_at: now,
            updated_at: now,
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn update_subscriber(
        &self,
        params: UpdateSubscriberParams,
    ) -> Result<SubscriberRecord, RepoError> {
        let mut rows = self.subscribers.lock().expect("lock");
        let row = rows
            .iter_mut()
            .find(|row| row.id == params.id)
            .ok_or(RepoError::NotFound)?;
        row.name = params.name;
        row.categories = params.categories;
        row.subscribed = params.subscribed;
        row.updated_at = OffsetDateTime::now_utc();
        Ok(row.clone())
    }
}

#[async_trait]
impl ContentRepo for MemoryStore {
    async fn find_content(&self, id: Uuid) -> Result<Option<ContentRecord>, RepoError> {
        if failing(&self.fail_content_lookup) {
            return Err(RepoError::Timeout);
        }
        Ok(self.content_item(id))
    }

    async fn create_content(
        &self,
        params: CreateContentParams,
    ) -> Result<ContentRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let record = ContentRecord {
            id: Uuid::new_v4(),
            kind: params.kind,
            title: params.title,
            excerpt: params.excerpt,
            short_description: params.short_description,
            description: params.description,
            published_at: params.published_at,
            published: params.published,
            file_id: params.file_id,
            download_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.insert_content(record.clone());
        Ok(record)
    }

    async fn update_content(
        &self,
        params: UpdateContentParams,
    ) -> Result<Option<ContentRecord>, RepoError> {
        let mut items = self.content.lock().expect("lock");
        let Some(item) = items
            .get_mut(&params.id)
            .filter(|item| item.kind == params.kind)
        else {
            return Ok(None);
        };
        if let Some(title) = params.title {
            item.title = title;
        }
        if let Some(excerpt) = params.excerpt {
            item.excerpt = excerpt;
        }
        if let Some(short_description) = params.short_description {
            item.short_description = short_description;
        }
        if let Some(description) = params.description {
            item.description = description;
        }
        if let Some(published_at) = params.published_at {
            item.published_at = published_at;
        }
        if let Some(published) = params.published {
            item.published = published;
        }
        if let Some(file_id) = params.file_id {
            item.file_id = file_id;
        }
        item.updated_at = OffsetDateTime::now_utc();
        Ok(Some(item.clone()))
    }

    async fn increment_download_count(&self, id: Uuid) -> Result<i64, RepoError> {
        if failing(&self.fail_increment) {
            return Err(RepoError::Timeout);
        }
        let mut items = self.content.lock().expect("lock");
        let item = items.get_mut(&id).ok_or(RepoError::NotFound)?;
        item.download_count += 1;
        Ok(item.download_count)
    }
}

#[async_trait]
impl FilesRepo for MemoryStore {
    async fn insert_file(&self, record: FileRecord) -> Result<(), RepoError> {
        self.files.lock().expect("lock").insert(record.id, record);
        Ok(())
    }

    async fn find_file(&self, id: Uuid) -> Result<Option<FileRecord>, RepoError> {
        Ok(self.files.lock().expect("lock").get(&id).cloned())
    }
}

#[async_trait]
impl InquiriesRepo for MemoryStore {
    async fn insert_inquiry(&self, record: InquiryRecord) -> Result<(), RepoError> {
        self.inquiries.lock().expect("lock").push(record);
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for MemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        if failing(&self.fail_ping) {
            return Err(RepoError::Timeout);
        }
        Ok(())
    }
}

/// Records delivered mail; addresses in `reject` fail at the transport.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    reject: HashSet<String>,
    delay: Option<Duration>,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rejecting(addresses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            reject: addresses.iter().map(|address| address.to_string()).collect(),
            ..Self::default()
        })
    }

    /// Every send sleeps for `delay` before it is recorded.
    pub fn delayed(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject.contains(&mail.to) {
            return Err(MailError::Transport(format!("mailbox {} unavailable", mail.to)));
        }
        self.sent.lock().expect("lock").push(mail);
        Ok(())
    }
}

/// Every service wired against one memory store and one recording mailer.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub storage: Arc<FileStorage>,
    pub newsletter: Arc<NewsletterService>,
    pub queue: NewsletterQueue,
    pub receiver: mpsc::Receiver<NewsletterTask>,
    pub content: Arc<ContentService>,
    pub subscriptions: Arc<SubscriptionService>,
    pub inquiries: Arc<InquiryService>,
    pub downloads: Arc<DownloadService>,
    pub files: Arc<FileService>,
    dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_mailer(RecordingMailer::new())
    }

    pub fn with_mailer(mailer: Arc<RecordingMailer>) -> Self {
        let store = MemoryStore::new();
        let dir = TempDir::new().expect("temp dir");
        let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()).expect("storage"));

        let links = NewsletterLinks::new(Url::parse(SITE_URL).expect("url"), HashMap::new());
        let dispatcher = FanOutDispatcher::new(mailer.clone(), FROM);
        let newsletter = Arc::new(NewsletterService::new(
            store.clone(),
            store.clone(),
            links,
            dispatcher,
        ));
        let (queue, receiver) = NewsletterQueue::new(16);

        let content = Arc::new(ContentService::new(
            store.clone(),
            store.clone(),
            queue.clone(),
            newsletter.clone(),
        ));
        let subscriptions = Arc::new(SubscriptionService::new(store.clone()));
        let inquiries = Arc::new(InquiryService::new(
            store.clone(),
            queue.clone(),
            InquiryNotifications {
                from: FROM.to_string(),
                to: Some("team@example.com".to_string()),
            },
        ));
        let downloads = Arc::new(DownloadService::new(
            store.clone(),
            store.clone(),
            storage.clone(),
        ));
        let files = Arc::new(FileService::new(store.clone(), storage.clone()));

        Self {
            store,
            mailer,
            storage,
            newsletter,
            queue,
            receiver,
            content,
            subscriptions,
            inquiries,
            downloads,
            files,
            dir,
        }
    }

    pub fn storage_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn public_router(&self) -> Router {
        build_public_router(PublicState {
            subscriptions: self.subscriptions.clone(),
            inquiries: self.inquiries.clone(),
            downloads: self.downloads.clone(),
            health: self.store.clone(),
        })
    }

    pub fn admin_router(&self, upload_body_limit: usize) -> Router {
        build_admin_router(
            AdminState {
                content: self.content.clone(),
                files: self.files.clone(),
                health: self.store.clone(),
            },
            upload_body_limit,
        )
    }

    pub fn worker(&self) -> NewsletterWorker {
        NewsletterWorker::new(self.newsletter.clone(), self.mailer.clone())
    }

    /// Tasks enqueued so far, without waiting.
    pub fn drain_tasks(&mut self) -> Vec<NewsletterTask> {
        let mut tasks = Vec::new();
        while let Ok(task) = self.receiver.try_recv() {
            tasks.push(task);
        }
        tasks
    }
}

pub fn content_record(kind: ContentKind, title: &str) -> ContentRecord {
    let now = OffsetDateTime::now_utc();
    ContentRecord {
        id: Uuid::new_v4(),
        kind,
        title: title.to_string(),
        excerpt: None,
        short_description: None,
        description: None,
        published_at: None,
        published: false,
        file_id: None,
        download_count: 0,
        created_at: now,
        updated_at: now,
    }
}
