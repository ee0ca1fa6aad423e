//! Conversion lifecycle records and job payloads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::artifact::{ArtifactKey, BinaryResource};
use super::id::ConversionId;

/// Lifecycle status of a conversion record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversionStatus {
    /// Conversion is running.
    Pending,
    /// At least one LOD was persisted.
    Succeeded,
    /// The conversion failed or produced no LOD.
    Failed,
}

impl ConversionStatus {
    /// Whether no further transition is possible from this status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Stable upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted lifecycle state for one conversion attempt on one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRecord {
    /// Attempt identifier.
    pub id: ConversionId,
    /// Target artifact.
    pub key: ArtifactKey,
    /// Current status.
    pub status: ConversionStatus,
    /// When the record was created.
    pub started_at: DateTime<Utc>,
    /// When the record reached a terminal status.
    pub ended_at: Option<DateTime<Utc>>,
}

impl ConversionRecord {
    /// Create a fresh pending record.
    pub fn pending(key: ArtifactKey) -> Self {
        Self {
            id: ConversionId::new(),
            key,
            status: ConversionStatus::Pending,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Whether the record is still pending.
    pub fn is_pending(&self) -> bool {
        self.status == ConversionStatus::Pending
    }
}

/// A request to convert one source binary for one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionJob {
    /// Target artifact key.
    pub key: ArtifactKey,
    /// Source CAD binary in the artifact store.
    pub source: BinaryResource,
}

impl ConversionJob {
    /// Create a new job.
    pub fn new(key: impl Into<ArtifactKey>, source: BinaryResource) -> Self {
        Self {
            key: key.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal() {
        assert!(!ConversionStatus::Pending.is_terminal());
        assert!(ConversionStatus::Succeeded.is_terminal());
        assert!(ConversionStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_serializes_upper_case() {
        let json = serde_json::to_string(&ConversionStatus::Succeeded).expect("serialize");
        assert_eq!(json, "\"SUCCEEDED\"");
    }

    #[test]
    fn test_job_payload_shape() {
        let job = ConversionJob::new("part-1", BinaryResource::new("part-1/model.ifc", 3));
        let value = serde_json::to_value(&job).expect("serialize");
        assert_eq!(value["key"], "part-1");
        assert_eq!(value["source"]["name"], "model.ifc");
    }
}
