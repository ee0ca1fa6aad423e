//! Domain metadata collaborator consumed by the conversion pipeline.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{ArtifactKey, BinaryResource, BoundingBox, ConversionRecord, GeometryLod};

/// Narrow view of the domain metadata service: conversion records,
/// geometries and attached files of an artifact.
#[async_trait]
pub trait MetadataService: Send + Sync + std::fmt::Debug + 'static {
    /// Fetch the current conversion record for `key`, if any.
    async fn get_conversion(&self, key: &ArtifactKey) -> AppResult<Option<ConversionRecord>>;

    /// Create a new `PENDING` record for `key`.
    ///
    /// Fails with a conflict if a record already exists.
    async fn create_conversion(&self, key: &ArtifactKey) -> AppResult<ConversionRecord>;

    /// Remove the record for `key` together with the geometries and attached
    /// files registered for it. Removing a missing record is a no-op.
    async fn remove_conversion(&self, key: &ArtifactKey) -> AppResult<()>;

    /// Move the pending record for `key` to `SUCCEEDED` or `FAILED`.
    async fn end_conversion(&self, key: &ArtifactKey, succeeded: bool) -> AppResult<ConversionRecord>;

    /// Register a geometry at `quality`, returning the resource the mesh
    /// bytes must be written to.
    async fn save_geometry(
        &self,
        key: &ArtifactKey,
        file_name: &str,
        quality: u32,
        byte_size: u64,
        bounding_box: BoundingBox,
    ) -> AppResult<GeometryLod>;

    /// Unregister the geometry of `key` at `quality`, if any.
    async fn remove_geometry(&self, key: &ArtifactKey, quality: u32) -> AppResult<()>;

    /// Register an attached file under `category`, returning the resource
    /// its bytes must be written to.
    async fn save_attached_file(
        &self,
        key: &ArtifactKey,
        file_name: &str,
        category: &str,
        byte_size: u64,
    ) -> AppResult<BinaryResource>;
}
