//! Unified error type for the conversion pipeline.
//!
//! Tool, staging and persistence failures are consolidated into a single
//! `ConversionError` enum. [`ConversionError::kind`] collapses the variants
//! into the coarse categories recorded in job reports, and the enum maps
//! cleanly to `meshhub_core::error::AppError`.

use std::fmt;
use std::path::PathBuf;

use meshhub_core::error::AppError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while converting, analyzing or decimating a mesh.
#[derive(Debug, Error)]
pub enum ConversionError {
    // --- Tool preconditions ---
    /// Configured executable does not exist (or is not on `PATH`).
    #[error("Tool not found: {path}")]
    ToolUnavailable {
        /// The configured path or program name.
        path: PathBuf,
    },

    /// Executable exists but lacks execute permission.
    #[error("Tool has no execution rights: {path}")]
    ToolNotExecutable {
        /// The resolved path.
        path: PathBuf,
    },

    // --- Process execution ---
    /// Tool exited with a non-zero status.
    #[error("{tool} exited with code {code}: {stderr}")]
    ToolExecutionFailed {
        /// Tool that failed.
        tool: String,
        /// The exit code.
        code: i32,
        /// Captured stderr output.
        stderr: String,
    },

    /// Tool was terminated by a signal.
    #[error("{tool} was killed (signal termination)")]
    ToolKilled {
        /// Tool that was killed.
        tool: String,
    },

    /// Tool exceeded the configured time limit and was killed.
    #[error("{tool} timed out after {timeout_seconds}s")]
    ToolTimeout {
        /// Tool that timed out.
        tool: String,
        /// The limit that was exceeded.
        timeout_seconds: u64,
    },

    /// Tool exited successfully but did not write its output.
    #[error("Output file not created: {path}")]
    OutputNotCreated {
        /// Expected output path.
        path: PathBuf,
    },

    // --- Pipeline ---
    /// No registered converter accepts the source extension.
    #[error("No CAD converter able to handle {file_name}")]
    UnsupportedFormat {
        /// Source file name.
        file_name: String,
        /// Extracted extension, if the name had one.
        extension: Option<String>,
    },

    /// Mesh could not be analyzed for its bounding box.
    #[error("Cannot analyze {path}: {reason}")]
    Analysis {
        /// Mesh path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// Artifact store or metadata service failure.
    #[error("Storage error: {0}")]
    Storage(AppError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error category reported for a failed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionErrorKind {
    /// Executable missing.
    ToolUnavailable,
    /// Executable lacks execute permission.
    ToolNotExecutable,
    /// Non-zero exit status.
    ToolExecutionFailed,
    /// Filesystem or store failure.
    IoFailure,
    /// Process killed or timed out.
    InterruptedExecution,
    /// No converter for the extension.
    UnsupportedFormat,
    /// Bounding-box analysis failed (non-fatal).
    AnalysisFailure,
}

impl fmt::Display for ConversionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ToolUnavailable => "ToolUnavailable",
            Self::ToolNotExecutable => "ToolNotExecutable",
            Self::ToolExecutionFailed => "ToolExecutionFailed",
            Self::IoFailure => "IOFailure",
            Self::InterruptedExecution => "InterruptedExecution",
            Self::UnsupportedFormat => "UnsupportedFormat",
            Self::AnalysisFailure => "AnalysisFailure",
        };
        f.write_str(name)
    }
}

impl ConversionError {
    /// Category of this error.
    pub fn kind(&self) -> ConversionErrorKind {
        match self {
            Self::ToolUnavailable { .. } => ConversionErrorKind::ToolUnavailable,
            Self::ToolNotExecutable { .. } => ConversionErrorKind::ToolNotExecutable,
            Self::ToolExecutionFailed { .. } => ConversionErrorKind::ToolExecutionFailed,
            Self::ToolKilled { .. } | Self::ToolTimeout { .. } => {
                ConversionErrorKind::InterruptedExecution
            }
            Self::UnsupportedFormat { .. } => ConversionErrorKind::UnsupportedFormat,
            Self::Analysis { .. } => ConversionErrorKind::AnalysisFailure,
            Self::OutputNotCreated { .. } | Self::Storage(_) | Self::Io(_) => {
                ConversionErrorKind::IoFailure
            }
        }
    }

    /// Exit code of a failed tool run.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ToolExecutionFailed { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Captured stderr of a failed tool run.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::ToolExecutionFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

impl From<AppError> for ConversionError {
    fn from(err: AppError) -> Self {
        Self::Storage(err)
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::Storage(inner) => inner,
            ConversionError::UnsupportedFormat { .. } => AppError::validation(err.to_string()),
            ConversionError::ToolUnavailable { .. } | ConversionError::ToolNotExecutable { .. } => {
                AppError::configuration(err.to_string())
            }
            ConversionError::ToolExecutionFailed { .. }
            | ConversionError::ToolKilled { .. }
            | ConversionError::ToolTimeout { .. } => AppError::external(err.to_string()),
            _ => AppError::internal(err.to_string()),
        }
    }
}
