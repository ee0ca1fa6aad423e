//! Conversion orchestration: the per-artifact state machine and the
//! staging → convert → analyze → decimate → persist pipeline.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashSet;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, instrument, warn};

use meshhub_core::config::ConversionConfig;
use meshhub_core::result::AppResult;
use meshhub_core::traits::conversion::ConversionService;
use meshhub_core::traits::metadata::MetadataService;
use meshhub_core::traits::store::ArtifactStore;
use meshhub_core::types::{ArtifactKey, BinaryResource, BoundingBox, ConversionJob, GeometryLod};

use crate::converters::{CadConverter, ConverterRegistry};
use crate::decimator::Decimator;
use crate::error::ConversionError;
use crate::executor::{ToolAvailability, ToolExecutor};
use crate::geometry::GeometryAnalyzer;
use crate::metrics::{ConversionMetrics, MetricsSnapshot};
use crate::models::{
    ATTACHED_FILES_CATEGORY, ConversionOutcome, ConversionReport, LodFile, file_name_of,
};
use crate::staging::{StagingArea, StagingDirectory};

/// Persisted output of one pipeline run.
#[derive(Debug, Default)]
struct PersistedOutput {
    lods: Vec<GeometryLod>,
    materials: Vec<BinaryResource>,
}

/// Drives conversion jobs and owns their record transitions.
///
/// A key moves `NONE → PENDING → {SUCCEEDED, FAILED}`. A job whose key is
/// already pending, in the metadata service or in this process, is
/// skipped without side effects. Pipeline failures never escape
/// [`ConversionOrchestrator::convert`]; they finalize the record as failed.
#[derive(Debug)]
pub struct ConversionOrchestrator {
    registry: ConverterRegistry,
    decimator: Decimator,
    staging: StagingArea,
    store: Arc<dyn ArtifactStore>,
    metadata: Arc<dyn MetadataService>,
    metrics: Arc<ConversionMetrics>,
    in_flight: DashSet<ArtifactKey>,
}

impl ConversionOrchestrator {
    /// Build an orchestrator with the default converters from `config`.
    pub fn new(
        config: &ConversionConfig,
        store: Arc<dyn ArtifactStore>,
        metadata: Arc<dyn MetadataService>,
    ) -> Self {
        let metrics = Arc::new(ConversionMetrics::new());
        let executor = ToolExecutor::new(
            config.tool_timeout_seconds.map(Duration::from_secs),
            metrics.clone(),
        );
        let registry = ConverterRegistry::with_defaults(config, executor.clone());
        let decimator = Decimator::new(
            config.decimater_path.clone(),
            config.lod_ratios.clone(),
            executor,
            metrics.clone(),
        );

        Self {
            registry,
            decimator,
            staging: StagingArea::new(config.effective_staging_root()),
            store,
            metadata,
            metrics,
            in_flight: DashSet::new(),
        }
    }

    /// Current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Availability of every configured external tool.
    pub fn check_tools(&self) -> Vec<ToolAvailability> {
        let mut report = self.registry.check_tools();
        report.push(self.decimator.tool_availability());
        report
    }

    /// Run one conversion job to completion.
    #[instrument(skip(self, job), fields(key = %job.key, source = %job.source.name))]
    pub async fn convert(&self, job: ConversionJob) -> ConversionReport {
        let start = Instant::now();
        let key = job.key.clone();

        let Some(_claim) = KeyClaim::acquire(&self.in_flight, &key) else {
            info!("Conversion already running in this process, skipping");
            self.metrics.record_skipped();
            return ConversionReport::new(key, ConversionOutcome::SkippedPending);
        };

        match self.metadata.get_conversion(&key).await {
            Ok(Some(existing)) if existing.is_pending() => {
                warn!(conversion_id = %existing.id, "Conversion already pending, skipping");
                self.metrics.record_skipped();
                return ConversionReport::new(key, ConversionOutcome::SkippedPending);
            }
            Ok(Some(existing)) => {
                debug!(status = %existing.status, "Removing previous ended conversion");
                if let Err(e) = self.metadata.remove_conversion(&key).await {
                    error!(error = %e, "Failed to remove previous conversion");
                    return ConversionReport::new(key, ConversionOutcome::Aborted);
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "Failed to read conversion record");
                return ConversionReport::new(key, ConversionOutcome::Aborted);
            }
        }

        let record = match self.metadata.create_conversion(&key).await {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "Failed to create conversion record");
                return ConversionReport::new(key, ConversionOutcome::Aborted);
            }
        };
        self.metrics.record_started();

        let result = self.run_pipeline(&job).await;

        let (persisted, failure) = match result {
            Ok(out) => (out, None),
            Err(e) => {
                error!(
                    error = %e,
                    kind = %e.kind(),
                    exit_code = ?e.exit_code(),
                    "Cannot convert {}",
                    job.source.name
                );
                (PersistedOutput::default(), Some(e))
            }
        };

        let succeeded = !persisted.lods.is_empty();
        let status = match self.metadata.end_conversion(&key, succeeded).await {
            Ok(ended) => Some(ended.status),
            Err(e) => {
                error!(error = %e, "Failed to finalize conversion record");
                None
            }
        };

        let elapsed = start.elapsed();
        if succeeded {
            self.metrics.record_success(elapsed);
        } else {
            self.metrics.record_failure(elapsed);
        }

        let mut report = ConversionReport::new(
            key,
            if succeeded {
                ConversionOutcome::Succeeded
            } else {
                ConversionOutcome::Failed
            },
        );
        if let Some(e) = &failure {
            report = report.with_error(e);
        }
        report.conversion_id = Some(record.id);
        report.status = status;
        report.lods = persisted.lods;
        report.materials = persisted.materials;
        report.duration_ms = elapsed.as_millis() as u64;

        info!(
            outcome = ?report.outcome,
            lods = report.lods.len(),
            elapsed_ms = report.duration_ms,
            "Conversion ended"
        );
        report
    }

    /// Select a converter, then run the staged pipeline and always remove
    /// the staging directory afterwards.
    async fn run_pipeline(&self, job: &ConversionJob) -> Result<PersistedOutput, ConversionError> {
        let Some(converter) = self.registry.select(&job.source) else {
            self.metrics.record_unsupported();
            return Err(ConversionError::UnsupportedFormat {
                file_name: job.source.name.trim().to_string(),
                extension: job.source.extension().map(str::to_string),
            });
        };
        debug!(converter = converter.name(), "Selected converter");

        let staging = self.staging.create().await?;
        let result = self.run_staged(job, converter.as_ref(), &staging).await;
        staging.cleanup().await;
        result
    }

    async fn run_staged(
        &self,
        job: &ConversionJob,
        converter: &dyn CadConverter,
        staging: &StagingDirectory,
    ) -> Result<PersistedOutput, ConversionError> {
        let source = staging.stage_from(self.store.as_ref(), &job.source).await?;
        let converted = converter.convert(&source, staging.path()).await?;

        let bounding_box = GeometryAnalyzer::analyze(&converted.mesh).await;
        let lod_files = self
            .decimator
            .generate_lods(&converted.mesh, staging.path())
            .await;

        let mut out = PersistedOutput::default();
        for lod in &lod_files {
            match self.persist_geometry(&job.key, lod, bounding_box).await {
                Ok(saved) => out.lods.push(saved),
                Err(e) => error!(
                    quality = lod.quality,
                    error = %e,
                    "Cannot save geometry"
                ),
            }
        }

        for material in &converted.materials {
            match self.persist_material(&job.key, material).await {
                Ok(Some(saved)) => out.materials.push(saved),
                Ok(None) => debug!(path = %material.display(), "No material file written, skipping"),
                Err(e) => error!(path = %material.display(), error = %e, "Cannot save attached file"),
            }
        }

        converted.release().await;
        Ok(out)
    }

    async fn persist_geometry(
        &self,
        key: &ArtifactKey,
        lod: &LodFile,
        bounding_box: BoundingBox,
    ) -> Result<GeometryLod, ConversionError> {
        let size = tokio::fs::metadata(&lod.path).await?.len();
        let saved = self
            .metadata
            .save_geometry(key, &file_name_of(&lod.path), lod.quality, size, bounding_box)
            .await?;
        let written = match self.copy_to_store(&lod.path, &saved.resource).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(undo) = self.metadata.remove_geometry(key, lod.quality).await {
                    error!(quality = lod.quality, error = %undo, "Cannot unregister unstored geometry");
                }
                return Err(e);
            }
        };
        self.metrics.record_lod_persisted(written);
        info!(quality = lod.quality, resource = %saved.resource.full_name, bytes = written, "Geometry saved");
        Ok(saved)
    }

    async fn persist_material(
        &self,
        key: &ArtifactKey,
        path: &Path,
    ) -> Result<Option<BinaryResource>, ConversionError> {
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let resource = self
            .metadata
            .save_attached_file(key, &file_name_of(path), ATTACHED_FILES_CATEGORY, size)
            .await?;
        self.copy_to_store(path, &resource).await?;
        info!(resource = %resource.full_name, "Attached file saved");
        Ok(Some(resource))
    }

    async fn copy_to_store(
        &self,
        path: &Path,
        resource: &BinaryResource,
    ) -> Result<u64, ConversionError> {
        let file = tokio::fs::File::open(path).await?;
        let written = self
            .store
            .write_stream(resource, Box::pin(ReaderStream::new(file)))
            .await?;
        Ok(written)
    }
}

#[async_trait]
impl ConversionService for ConversionOrchestrator {
    async fn convert(&self, job: ConversionJob) -> AppResult<serde_json::Value> {
        let report = ConversionOrchestrator::convert(self, job).await;
        Ok(serde_json::to_value(report)?)
    }
}

/// In-process exclusive claim on an artifact key, released on drop.
struct KeyClaim<'a> {
    set: &'a DashSet<ArtifactKey>,
    key: ArtifactKey,
}

impl<'a> KeyClaim<'a> {
    fn acquire(set: &'a DashSet<ArtifactKey>, key: &ArtifactKey) -> Option<Self> {
        set.insert(key.clone()).then(|| Self {
            set,
            key: key.clone(),
        })
    }
}

impl Drop for KeyClaim<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.key);
    }
}
