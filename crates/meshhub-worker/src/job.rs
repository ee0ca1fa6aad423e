//! Job envelopes exchanged between submitters and the worker pool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use meshhub_core::types::JobId;

/// A job waiting in, or taken from, the worker queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJob {
    /// Job identifier.
    pub id: JobId,
    /// Handler key, e.g. `cad_conversion`.
    pub job_type: String,
    /// Handler-specific payload.
    pub payload: Value,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
}

impl QueuedJob {
    /// Wrap a payload for `job_type`.
    pub fn new(job_type: impl Into<String>, payload: Value) -> Self {
        Self {
            id: JobId::new(),
            job_type: job_type.into(),
            payload,
            submitted_at: Utc::now(),
        }
    }

    /// Acknowledgement handed back to the submitter.
    pub fn ack(&self) -> JobAck {
        JobAck {
            job_id: self.id,
            job_type: self.job_type.clone(),
            submitted_at: self.submitted_at,
        }
    }
}

/// Receipt for an accepted job. Carries no result; outcomes are visible
/// through the conversion record and the logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAck {
    /// Identifier of the accepted job.
    pub job_id: JobId,
    /// Job type.
    pub job_type: String,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
}
