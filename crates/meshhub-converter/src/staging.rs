//! Per-job staging directories.
//!
//! Each job works inside `<root>/meshhub-<uuid>`. The directory is removed
//! by [`StagingDirectory::cleanup`] and, if that is never reached, by its
//! `Drop` impl.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use meshhub_core::traits::store::ArtifactStore;
use meshhub_core::types::BinaryResource;

use crate::error::ConversionError;

/// Factory for per-job staging directories under a common root.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Create a staging area rooted at `root`. Nothing is created on disk
    /// until [`StagingArea::create`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a fresh, uniquely named directory for one job.
    pub async fn create(&self) -> Result<StagingDirectory, ConversionError> {
        let root = std::path::absolute(&self.root)?;
        tokio::fs::create_dir_all(&root).await?;

        let path = root.join(format!("meshhub-{}", Uuid::new_v4()));
        tokio::fs::create_dir(&path).await?;
        debug!(dir = %path.display(), "Created staging directory");

        Ok(StagingDirectory {
            path,
            removed: false,
        })
    }
}

/// A staging directory exclusively owned by one job.
#[derive(Debug)]
pub struct StagingDirectory {
    path: PathBuf,
    removed: bool,
}

impl StagingDirectory {
    /// Absolute path of the directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy `resource` from the store into the directory, named after the
    /// resource with surrounding whitespace trimmed.
    pub async fn stage_from(
        &self,
        store: &dyn ArtifactStore,
        resource: &BinaryResource,
    ) -> Result<PathBuf, ConversionError> {
        let name = Path::new(resource.name.trim())
            .file_name()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("Invalid source name: {:?}", resource.name),
                )
            })?
            .to_owned();
        let target = self.path.join(name);

        let mut stream = store.read(resource).await?;
        let mut file = tokio::fs::File::create(&target).await?;
        let mut copied = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            copied += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!(source = %resource.full_name, bytes = copied, "Staged source");
        Ok(target)
    }

    /// Remove the directory and everything in it.
    pub async fn cleanup(mut self) {
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!(dir = %self.path.display(), "Removed staging directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(dir = %self.path.display(), error = %e, "Failed to remove staging directory");
            }
        }
        self.removed = true;
    }
}

impl Drop for StagingDirectory {
    fn drop(&mut self) {
        if !self.removed {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}
