//! Bounding-box analysis of OBJ meshes.

use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use meshhub_core::types::BoundingBox;

use crate::error::ConversionError;

/// Computes axis-aligned bounding boxes from OBJ vertex records.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryAnalyzer;

impl GeometryAnalyzer {
    /// Bounding box of the mesh, or the zero box when the mesh cannot be
    /// read or contains no valid vertex.
    pub async fn analyze(path: &Path) -> BoundingBox {
        match Self::calculate_box(path).await {
            Ok(bbox) => bbox,
            Err(e) => {
                warn!(mesh = %path.display(), error = %e, "Geometry analysis failed, using zero box");
                BoundingBox::zero()
            }
        }
    }

    /// Scan every `v x y z` record and track min/max per axis.
    pub async fn calculate_box(path: &Path) -> Result<BoundingBox, ConversionError> {
        let analysis = |reason: String| ConversionError::Analysis {
            path: path.to_path_buf(),
            reason,
        };

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| analysis(e.to_string()))?;
        let mut lines = BufReader::new(file).lines();

        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        let mut vertices = 0u64;
        let mut line_no = 0u64;

        while let Some(line) = lines.next_line().await.map_err(|e| analysis(e.to_string()))? {
            line_no += 1;
            let line = line.trim_start();
            if !line.starts_with("v ") && !line.starts_with("v\t") {
                continue;
            }

            let mut coords = [0f64; 3];
            let mut parts = line[1..].split_whitespace();
            for coord in &mut coords {
                let token = parts
                    .next()
                    .ok_or_else(|| analysis(format!("line {line_no}: vertex has fewer than 3 coordinates")))?;
                *coord = token
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| analysis(format!("line {line_no}: invalid coordinate {token:?}")))?;
            }

            for axis in 0..3 {
                min[axis] = min[axis].min(coords[axis]);
                max[axis] = max[axis].max(coords[axis]);
            }
            vertices += 1;
        }

        if vertices == 0 {
            return Err(analysis("mesh has no vertices".to_string()));
        }

        Ok(BoundingBox { min, max })
    }
}
