//! Conversion service seam between the worker and the pipeline.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::ConversionJob;

/// Runs one conversion job to completion.
///
/// Implementations finalize the conversion record themselves; the
/// returned JSON is a summary for the caller's logs.
#[async_trait]
pub trait ConversionService: Send + Sync + std::fmt::Debug + 'static {
    /// Convert the job's source into persisted LODs.
    async fn convert(&self, job: ConversionJob) -> AppResult<serde_json::Value>;
}
