//! CAD conversion job handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use meshhub_core::error::AppError;
use meshhub_core::traits::conversion::ConversionService;
use meshhub_core::types::ConversionJob;

use crate::executor::{JobExecutionError, JobHandler};
use crate::job::QueuedJob;

/// Job type key for CAD conversions.
pub const CONVERSION_JOB_TYPE: &str = "cad_conversion";

/// Handles CAD conversion jobs
#[derive(Debug)]
pub struct ConversionJobHandler {
    /// Conversion service
    converter: Arc<dyn ConversionService>,
}

impl ConversionJobHandler {
    /// Create a new CAD conversion job handler
    pub fn new(converter: Arc<dyn ConversionService>) -> Self {
        Self { converter }
    }

    /// Build the queue payload for `job`.
    pub fn payload(job: &ConversionJob) -> Result<Value, AppError> {
        Ok(serde_json::to_value(job)?)
    }
}

#[async_trait]
impl JobHandler for ConversionJobHandler {
    fn job_type(&self) -> &str {
        CONVERSION_JOB_TYPE
    }

    async fn execute(&self, job: &QueuedJob) -> Result<Option<Value>, JobExecutionError> {
        let conversion: ConversionJob = serde_json::from_value(job.payload.clone()).map_err(|e| {
            JobExecutionError::Permanent(format!("Invalid conversion payload: {e}"))
        })?;

        tracing::info!(
            key = %conversion.key,
            file = %conversion.source.name,
            "Starting CAD conversion"
        );

        let summary = self.converter.convert(conversion).await?;

        Ok(Some(summary))
    }
}
