//! Content-addressed file storage for downloadable resources.
//!
//! Files live directly under the storage root as `<sha256 hex><.ext>`.

use std::error::Error as StdError;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_stream::try_stream;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, pin_mut, stream::BoxStream};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::{
    fs,
    io::{AsyncReadExt, AsyncWriteExt},
};
use uuid::Uuid;

const READ_CHUNK_BYTES: usize = 64 * 1024;

/// Byte stream of a stored file.
pub type FileStream = BoxStream<'static, io::Result<Bytes>>;

#[derive(Debug, Error)]
pub enum FileStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("uploaded file exceeds configured body limit")]
    PayloadTooLarge {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("uploaded file stream failed")]
    PayloadStream {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error("uploaded file size exceeds supported range")]
    SizeOverflow,
}

impl FileStorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FileStorageError::Io(err) if err.kind() == io::ErrorKind::NotFound)
    }
}

/// Location and digest of a stored payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub hash: String,
    pub ext: String,
    pub size_bytes: i64,
}

impl StoredFile {
    pub fn stored_path(&self) -> String {
        format!("{}{}", self.hash, self.ext)
    }
}

#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open storage at `root`, creating the directory when missing.
    pub fn new(root: PathBuf) -> Result<Self, io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Stream a payload to disk and file it under its content hash.
    ///
    /// Identical payloads with the same extension share one stored file.
    pub async fn store_stream<S>(
        &self,
        original_name: &str,
        stream: S,
    ) -> Result<StoredFile, FileStorageError>
    where
        S: futures::Stream<Item = Result<Bytes, FileStorageError>>,
    {
        let incoming = self.root.join(format!(".incoming-{}", Uuid::new_v4().simple()));
        let mut file = fs::File::create(&incoming).await?;
        let mut hasher = Sha256::new();
        let mut total_bytes: u64 = 0;

        pin_mut!(stream);
        while let Some(chunk_result) = stream.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(err) => {
                    drop(file);
                    let _ = fs::remove_file(&incoming).await;
                    return Err(err);
                }
            };

            if chunk.is_empty() {
                continue;
            }

            total_bytes = total_bytes
                .checked_add(chunk.len() as u64)
                .ok_or(FileStorageError::SizeOverflow)?;
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
        }

        file.flush().await?;
        drop(file);

        if total_bytes == 0 {
            let _ = fs::remove_file(&incoming).await;
            return Err(FileStorageError::EmptyPayload);
        }

        let stored = StoredFile {
            hash: hex::encode(&hasher.finalize()[..]),
            ext: extension_of(original_name),
            size_bytes: i64::try_from(total_bytes).map_err(|_| FileStorageError::SizeOverflow)?,
        };
        fs::rename(&incoming, self.resolve(&stored.stored_path())?).await?;

        Ok(stored)
    }

    pub async fn exists(&self, stored_path: &str) -> Result<bool, FileStorageError> {
        let absolute = self.resolve(stored_path)?;
        Ok(fs::try_exists(absolute).await?)
    }

    /// Open a stored file for chunked reading.
    ///
    /// The file is opened eagerly so a missing file surfaces here rather than
    /// mid-response.
    pub async fn open_stream(&self, stored_path: &str) -> Result<FileStream, FileStorageError> {
        let absolute = self.resolve(stored_path)?;
        let file = fs::File::open(absolute).await?;
        Ok(Box::pin(read_chunks(file)))
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, FileStorageError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(FileStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

fn read_chunks(mut file: fs::File) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    try_stream! {
        loop {
            let mut buffer = BytesMut::with_capacity(READ_CHUNK_BYTES);
            let read = file.read_buf(&mut buffer).await?;
            if read == 0 {
                break;
            }
            yield buffer.freeze();
        }
    }
}

/// Lower-cased extension with its leading dot, or empty when absent.
pub fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|value| format!(".{value}"))
        .unwrap_or_default()
}
