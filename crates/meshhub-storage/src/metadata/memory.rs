//! In-memory metadata service backed by `dashmap`.
//!
//! Holds conversion records, geometries and attached files per artifact key.
//! Store paths follow `{key}/geometries/{name}` and `{key}/{category}/{name}`.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use meshhub_core::error::AppError;
use meshhub_core::result::AppResult;
use meshhub_core::traits::metadata::MetadataService;
use meshhub_core::types::{
    ArtifactKey, BinaryResource, BoundingBox, ConversionRecord, ConversionStatus, GeometryLod,
};

/// Metadata category under which geometries are stored.
pub const GEOMETRY_CATEGORY: &str = "geometries";

/// Process-local metadata service.
#[derive(Debug, Default)]
pub struct InMemoryMetadataService {
    conversions: DashMap<ArtifactKey, ConversionRecord>,
    geometries: DashMap<ArtifactKey, Vec<GeometryLod>>,
    attached: DashMap<ArtifactKey, Vec<BinaryResource>>,
}

impl InMemoryMetadataService {
    /// Create an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Geometries of `key`, ordered by quality.
    pub fn geometries(&self, key: &ArtifactKey) -> Vec<GeometryLod> {
        self.geometries
            .get(key)
            .map(|g| g.value().clone())
            .unwrap_or_default()
    }

    /// Attached files of `key` in registration order.
    pub fn attached_files(&self, key: &ArtifactKey) -> Vec<BinaryResource> {
        self.attached
            .get(key)
            .map(|a| a.value().clone())
            .unwrap_or_default()
    }

    /// Insert a record directly, e.g. a stale `PENDING` one left by a crash.
    pub fn insert_record(&self, record: ConversionRecord) {
        self.conversions.insert(record.key.clone(), record);
    }
}

#[async_trait]
impl MetadataService for InMemoryMetadataService {
    async fn get_conversion(&self, key: &ArtifactKey) -> AppResult<Option<ConversionRecord>> {
        Ok(self.conversions.get(key).map(|r| r.value().clone()))
    }

    async fn create_conversion(&self, key: &ArtifactKey) -> AppResult<ConversionRecord> {
        match self.conversions.entry(key.clone()) {
            Entry::Occupied(existing) => Err(AppError::conflict(format!(
                "Conversion for {key} already exists with status {}",
                existing.get().status
            ))),
            Entry::Vacant(slot) => {
                let record = ConversionRecord::pending(key.clone());
                slot.insert(record.clone());
                debug!(key = %key, conversion_id = %record.id, "Created conversion record");
                Ok(record)
            }
        }
    }

    async fn remove_conversion(&self, key: &ArtifactKey) -> AppResult<()> {
        self.conversions.remove(key);
        let geometries = self.geometries.remove(key).map_or(0, |(_, g)| g.len());
        let attached = self.attached.remove(key).map_or(0, |(_, a)| a.len());
        debug!(key = %key, geometries, attached, "Removed conversion and its outputs");
        Ok(())
    }

    async fn remove_geometry(&self, key: &ArtifactKey, quality: u32) -> AppResult<()> {
        if let Some(mut entry) = self.geometries.get_mut(key) {
            entry.retain(|g| g.quality != quality);
        }
        Ok(())
    }

    async fn end_conversion(&self, key: &ArtifactKey, succeeded: bool) -> AppResult<ConversionRecord> {
        let mut record = self
            .conversions
            .get_mut(key)
            .ok_or_else(|| AppError::not_found(format!("No conversion for {key}")))?;

        if !record.is_pending() {
            return Err(AppError::conflict(format!(
                "Conversion for {key} already ended with status {}",
                record.status
            )));
        }

        record.status = if succeeded {
            ConversionStatus::Succeeded
        } else {
            ConversionStatus::Failed
        };
        record.ended_at = Some(Utc::now());
        Ok(record.value().clone())
    }

    async fn save_geometry(
        &self,
        key: &ArtifactKey,
        file_name: &str,
        quality: u32,
        byte_size: u64,
        bounding_box: BoundingBox,
    ) -> AppResult<GeometryLod> {
        let lod = GeometryLod {
            quality,
            resource: BinaryResource::new(
                format!("{key}/{GEOMETRY_CATEGORY}/{file_name}"),
                byte_size,
            ),
            bounding_box,
        };

        let mut entry = self.geometries.entry(key.clone()).or_default();
        entry.retain(|g| g.quality != quality);
        entry.push(lod.clone());
        entry.sort_by_key(|g| g.quality);
        Ok(lod)
    }

    async fn save_attached_file(
        &self,
        key: &ArtifactKey,
        file_name: &str,
        category: &str,
        byte_size: u64,
    ) -> AppResult<BinaryResource> {
        let resource = BinaryResource::new(format!("{key}/{category}/{file_name}"), byte_size);

        let mut entry = self.attached.entry(key.clone()).or_default();
        entry.retain(|r| r.full_name != resource.full_name);
        entry.push(resource.clone());
        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ArtifactKey {
        ArtifactKey::new("part-1")
    }

    #[tokio::test]
    async fn test_conversion_lifecycle() {
        let svc = InMemoryMetadataService::new();
        assert!(svc.get_conversion(&key()).await.unwrap().is_none());

        let created = svc.create_conversion(&key()).await.unwrap();
        assert!(created.is_pending());

        let ended = svc.end_conversion(&key(), true).await.unwrap();
        assert_eq!(ended.status, ConversionStatus::Succeeded);
        assert!(ended.ended_at.is_some());

        let err = svc.end_conversion(&key(), false).await.unwrap_err();
        assert_eq!(err.kind, meshhub_core::error::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let svc = InMemoryMetadataService::new();
        svc.create_conversion(&key()).await.unwrap();
        assert!(svc.create_conversion(&key()).await.is_err());

        svc.remove_conversion(&key()).await.unwrap();
        assert!(svc.create_conversion(&key()).await.is_ok());
    }

    #[tokio::test]
    async fn test_save_geometry_replaces_same_quality() {
        let svc = InMemoryMetadataService::new();
        svc.save_geometry(&key(), "m20.obj", 2, 10, BoundingBox::zero())
            .await
            .unwrap();
        svc.save_geometry(&key(), "m100.obj", 0, 30, BoundingBox::zero())
            .await
            .unwrap();
        let lod = svc
            .save_geometry(&key(), "other100.obj", 0, 31, BoundingBox::zero())
            .await
            .unwrap();
        assert_eq!(lod.resource.full_name, "part-1/geometries/other100.obj");

        let lods = svc.geometries(&key());
        assert_eq!(lods.len(), 2);
        assert_eq!(lods[0].resource.name, "other100.obj");
        assert_eq!(lods[1].quality, 2);
    }

    #[tokio::test]
    async fn test_remove_conversion_drops_outputs() {
        let svc = InMemoryMetadataService::new();
        svc.create_conversion(&key()).await.unwrap();
        for (q, name) in ["m100.obj", "m60.obj", "m20.obj"].iter().enumerate() {
            svc.save_geometry(&key(), name, q as u32, 1, BoundingBox::zero())
                .await
                .unwrap();
        }
        svc.save_attached_file(&key(), "m.mtl", "attachedfiles", 1)
            .await
            .unwrap();
        svc.end_conversion(&key(), true).await.unwrap();

        svc.remove_conversion(&key()).await.unwrap();
        assert!(svc.get_conversion(&key()).await.unwrap().is_none());
        assert!(svc.geometries(&key()).is_empty());
        assert!(svc.attached_files(&key()).is_empty());
    }

    #[tokio::test]
    async fn test_remove_geometry_keeps_other_qualities() {
        let svc = InMemoryMetadataService::new();
        svc.save_geometry(&key(), "m100.obj", 0, 1, BoundingBox::zero())
            .await
            .unwrap();
        svc.save_geometry(&key(), "m60.obj", 1, 1, BoundingBox::zero())
            .await
            .unwrap();

        svc.remove_geometry(&key(), 0).await.unwrap();
        svc.remove_geometry(&ArtifactKey::new("unknown"), 0).await.unwrap();
        let lods = svc.geometries(&key());
        assert_eq!(lods.len(), 1);
        assert_eq!(lods[0].quality, 1);
    }

    #[tokio::test]
    async fn test_attached_file_path() {
        let svc = InMemoryMetadataService::new();
        let res = svc
            .save_attached_file(&key(), "abc.mtl", "attachedfiles", 42)
            .await
            .unwrap();
        assert_eq!(res.full_name, "part-1/attachedfiles/abc.mtl");
        assert_eq!(svc.attached_files(&key()).len(), 1);
    }
}
