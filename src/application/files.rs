use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    application::repos::{FilesRepo, RepoError},
    domain::{entities::FileRecord, error::DomainError},
    infra::files::{FileStorage, FileStorageError},
};

#[derive(Debug, Error)]
pub enum FileUploadError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Storage(#[from] FileStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FileService {
    files: Arc<dyn FilesRepo>,
    storage: Arc<FileStorage>,
}

impl FileService {
    pub fn new(files: Arc<dyn FilesRepo>, storage: Arc<FileStorage>) -> Self {
        Self { files, storage }
    }

    /// Persist an uploaded payload and record its metadata.
    ///
    /// A missing or generic content type is replaced by a guess from the
    /// file name.
    pub async fn upload<S>(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        stream: S,
    ) -> Result<FileRecord, FileUploadError>
    where
        S: futures::Stream<Item = Result<Bytes, FileStorageError>>,
    {
        let name = original_name.trim();
        DomainError::require(name, "file name")?;

        let stored = self.storage.store_stream(name, stream).await?;

        let mime = content_type
            .map(str::trim)
            .filter(|value| !value.is_empty() && *value != "application/octet-stream")
            .map(str::to_string)
            .or_else(|| mime_guess::from_path(name).first().map(|mime| mime.to_string()));

        let record = FileRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            hash: stored.hash,
            ext: stored.ext,
            mime,
            size_bytes: stored.size_bytes,
            created_at: OffsetDateTime::now_utc(),
        };
        self.files.insert_file(record.clone()).await?;

        info!(
            target = "tidings::files",
            file_id = %record.id,
            size_bytes = record.size_bytes,
            "file uploaded"
        );

        Ok(record)
    }
}
