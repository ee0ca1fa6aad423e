//! Persisted geometry (LOD) descriptors.

use serde::{Deserialize, Serialize};

use super::artifact::BinaryResource;

/// Axis-aligned bounding box of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum x, y, z.
    pub min: [f64; 3],
    /// Maximum x, y, z.
    pub max: [f64; 3],
}

impl BoundingBox {
    /// The all-zero box used when analysis fails.
    pub const fn zero() -> Self {
        Self {
            min: [0.0; 3],
            max: [0.0; 3],
        }
    }

    /// `[min_x, min_y, min_z, max_x, max_y, max_z]`.
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.min[0],
            self.min[1],
            self.min[2],
            self.max[0],
            self.max[1],
            self.max[2],
        ]
    }

    /// Whether every component is zero.
    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|v| *v == 0.0)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::zero()
    }
}

/// One persisted level of detail. Quality 0 is the highest fidelity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryLod {
    /// Quality index, 0 = highest.
    pub quality: u32,
    /// Stored mesh binary.
    pub resource: BinaryResource,
    /// Bounding box of the source mesh.
    pub bounding_box: BoundingBox,
}
