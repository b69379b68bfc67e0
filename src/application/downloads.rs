//! Counted resource downloads.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    application::repos::{ContentRepo, FilesRepo, RepoError},
    domain::{entities::FileRecord, types::ContentKind},
    infra::files::{FileStorage, FileStorageError, FileStream},
};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("resource `{0}` not found")]
    ResourceNotFound(Uuid),
    #[error("resource `{0}` is not published")]
    NotPublished(Uuid),
    #[error("resource `{0}` has no downloadable file")]
    FileReferenceMissing(Uuid),
    #[error("file for resource `{0}` is missing from storage")]
    FileMissing(Uuid),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Storage(#[from] FileStorageError),
}

/// A download that passed every precondition.
pub struct PreparedDownload {
    pub file: FileRecord,
    /// Counter value after this download, when the increment succeeded.
    pub download_count: Option<i64>,
    pub body: FileStream,
}

#[derive(Clone)]
pub struct DownloadService {
    content: Arc<dyn ContentRepo>,
    files: Arc<dyn FilesRepo>,
    storage: Arc<FileStorage>,
}

impl DownloadService {
    pub fn new(
        content: Arc<dyn ContentRepo>,
        files: Arc<dyn FilesRepo>,
        storage: Arc<FileStorage>,
    ) -> Self {
        Self {
            content,
            files,
            storage,
        }
    }

    /// Check preconditions in order, count the download, open the file.
    ///
    /// Order: resource exists, resource published, file reference resolves,
    /// file present in storage. A failed increment does not block the
    /// download.
    pub async fn prepare(&self, resource_id: Uuid) -> Result<PreparedDownload, DownloadError> {
        let resource = self
            .content
            .find_content(resource_id)
            .await?
            .filter(|item| item.kind == ContentKind::Resource)
            .ok_or(DownloadError::ResourceNotFound(resource_id))?;

        if !resource.publication().is_published() {
            return Err(DownloadError::NotPublished(resource_id));
        }

        let file_id = resource
            .file_id
            .ok_or(DownloadError::FileReferenceMissing(resource_id))?;
        let file = self
            .files
            .find_file(file_id)
            .await?
            .ok_or(DownloadError::FileReferenceMissing(resource_id))?;

        let stored_path = file.stored_path();
        if !self.storage.exists(&stored_path).await? {
            return Err(DownloadError::FileMissing(resource_id));
        }

        let download_count = match self.content.increment_download_count(resource_id).await {
            Ok(count) => {
                counter!("tidings_downloads_total").increment(1);
                Some(count)
            }
            Err(err) => {
                counter!("tidings_download_count_update_failed_total").increment(1);
                error!(
                    target = "tidings::downloads",
                    resource_id = %resource_id,
                    error = %err,
                    "failed to increment download count"
                );
                None
            }
        };

        let body = match self.storage.open_stream(&stored_path).await {
            Ok(body) => body,
            Err(err) if err.is_not_found() => return Err(DownloadError::FileMissing(resource_id)),
            Err(err) => return Err(err.into()),
        };

        info!(
            target = "tidings::downloads",
            resource_id = %resource_id,
            file_id = %file.id,
            download_count = ?download_count,
            "resource download started"
        );

        Ok(PreparedDownload {
            file,
            download_count,
            body,
        })
    }
}
