//! Local filesystem artifact store.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

use meshhub_core::config::StorageConfig;
use meshhub_core::error::{AppError, ErrorKind};
use meshhub_core::result::AppResult;
use meshhub_core::traits::store::{ArtifactStore, ByteStream};
use meshhub_core::types::BinaryResource;

/// Artifact store backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    /// Root directory for all stored binaries.
    root: PathBuf,
}

impl LocalArtifactStore {
    /// Create a store rooted at the given path, creating it if needed.
    pub async fn new(root_path: impl AsRef<Path>) -> AppResult<Self> {
        let root = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Create a store from the `storage.local` configuration section.
    pub async fn from_config(config: &StorageConfig) -> AppResult<Self> {
        Self::new(&config.local.root_path).await
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a store path to an absolute path within the root.
    ///
    /// Parent-directory segments are rejected so a resource can never
    /// escape the root.
    pub fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let clean = Path::new(path.trim_start_matches('/'));
        if clean
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(AppError::validation(format!("Invalid store path: {path}")));
        }
        Ok(self.root.join(clean))
    }

    /// Write an in-memory buffer to `path`, used to seed source binaries.
    pub async fn write_bytes(&self, path: &str, data: Bytes) -> AppResult<BinaryResource> {
        let full_path = self.resolve(path)?;
        ensure_parent(&full_path).await?;
        fs::write(&full_path, &data).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write file: {path}"),
                e,
            )
        })?;
        debug!(path, bytes = data.len(), "Wrote file");
        Ok(BinaryResource::new(path, data.len() as u64))
    }
}

async fn ensure_parent(path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create parent directory: {}", parent.display()),
                e,
            )
        })?;
    }
    Ok(())
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn read(&self, resource: &BinaryResource) -> AppResult<ByteStream> {
        let path = resource.full_name.as_str();
        let full_path = self.resolve(path)?;
        let file = fs::File::open(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("File not found: {path}"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to open file: {path}"),
                    e,
                )
            }
        })?;

        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn write_stream(&self, resource: &BinaryResource, mut stream: ByteStream) -> AppResult<u64> {
        let path = resource.full_name.as_str();
        let full_path = self.resolve(path)?;
        ensure_parent(&full_path).await?;

        let mut file = fs::File::create(&full_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create file: {path}"),
                e,
            )
        })?;

        let mut total_bytes = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| AppError::with_source(ErrorKind::Storage, "Stream read error", e))?;
            total_bytes += chunk.len() as u64;
            file.write_all(&chunk).await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to write chunk", e)
            })?;
        }

        file.flush()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to flush file", e))?;

        debug!(path, bytes = total_bytes, "Wrote file from stream");
        Ok(total_bytes)
    }
}
