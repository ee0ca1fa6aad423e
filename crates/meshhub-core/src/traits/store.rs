//! Artifact store trait for pluggable binary storage backends.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;
use crate::types::BinaryResource;

/// A byte stream type used for reading and writing binary contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Trait for binary storage backends holding sources, meshes and
/// attached files.
///
/// Defined here in `meshhub-core` and implemented in `meshhub-storage`.
#[async_trait]
pub trait ArtifactStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local").
    fn provider_type(&self) -> &str;

    /// Open the binary behind `resource` as a byte stream.
    async fn read(&self, resource: &BinaryResource) -> AppResult<ByteStream>;

    /// Write a byte stream to the location of `resource`, replacing any
    /// previous content. Returns the number of bytes written.
    async fn write_stream(&self, resource: &BinaryResource, stream: ByteStream) -> AppResult<u64>;
}
