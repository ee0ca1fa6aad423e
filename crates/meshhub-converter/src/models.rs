//! Data types exchanged between pipeline stages and returned to callers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use meshhub_core::types::{ArtifactKey, BinaryResource, ConversionId, ConversionStatus, GeometryLod};

use crate::error::{ConversionError, ConversionErrorKind};

/// Metadata category for material files persisted next to the meshes.
pub const ATTACHED_FILES_CATEGORY: &str = "attachedfiles";

/// Output of one converter run: the primary mesh plus companion materials.
///
/// Material paths may reference files the tool never wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// Primary triangulated mesh.
    pub mesh: PathBuf,
    /// Companion material files, in tool order.
    pub materials: Vec<PathBuf>,
}

impl ConversionResult {
    /// Delete the mesh and material files. Missing files are ignored.
    pub async fn release(self) {
        for path in std::iter::once(self.mesh).chain(self.materials) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to release converted file");
                }
            }
        }
    }
}

/// One LOD mesh produced by the decimation stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LodFile {
    /// Quality index, 0 = highest.
    pub quality: u32,
    /// Mesh file inside the staging directory.
    pub path: PathBuf,
}

/// Final outcome of a conversion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// Record finalized as succeeded.
    Succeeded,
    /// Record finalized as failed.
    Failed,
    /// A conversion for the key was already pending; nothing was done.
    SkippedPending,
    /// The metadata service failed before a record could be created.
    Aborted,
}

/// Summary of one conversion request, returned to the worker for logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Target artifact.
    pub key: ArtifactKey,
    /// Conversion attempt, when a record was created.
    pub conversion_id: Option<ConversionId>,
    /// Outcome.
    pub outcome: ConversionOutcome,
    /// Final record status as stored by the metadata service.
    pub status: Option<ConversionStatus>,
    /// Persisted LODs, ordered by quality.
    pub lods: Vec<GeometryLod>,
    /// Persisted material files.
    pub materials: Vec<BinaryResource>,
    /// Category of the stage error, if any.
    pub error_kind: Option<ConversionErrorKind>,
    /// Human-readable stage error, if any.
    pub error: Option<String>,
    /// Wall-clock duration.
    pub duration_ms: u64,
}

impl ConversionReport {
    pub(crate) fn new(key: ArtifactKey, outcome: ConversionOutcome) -> Self {
        Self {
            key,
            conversion_id: None,
            outcome,
            status: None,
            lods: Vec::new(),
            materials: Vec::new(),
            error_kind: None,
            error: None,
            duration_ms: 0,
        }
    }

    pub(crate) fn with_error(mut self, err: &ConversionError) -> Self {
        self.error_kind = Some(err.kind());
        self.error = Some(err.to_string());
        self
    }
}

/// Name of the LOD file the decimator writes for `ratio`: the `.obj`
/// suffix of `mesh_name` is replaced by the rounded percentage, so
/// `abc.obj` at 0.6 becomes `abc60.obj`.
pub fn lod_file_name(mesh_name: &str, ratio: f32) -> String {
    let base = mesh_name.strip_suffix(".obj").unwrap_or(mesh_name);
    format!("{base}{}.obj", ratio_percent(ratio))
}

/// Ratio as a rounded percentage.
pub fn ratio_percent(ratio: f32) -> u32 {
    (ratio * 100.0).round() as u32
}

/// Ratio as passed on the decimator command line (`1.0`, `0.6`, `0.2`).
pub fn format_ratio(ratio: f32) -> String {
    let text = ratio.to_string();
    if text.contains('.') || text.contains('e') {
        text
    } else {
        format!("{text}.0")
    }
}

/// File name component of `path`, lossily decoded.
pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
