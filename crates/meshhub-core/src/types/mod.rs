//! Core type definitions used across the MeshHub workspace.

pub mod artifact;
pub mod conversion;
pub mod geometry;
pub mod id;

pub use artifact::{ArtifactKey, BinaryResource};
pub use conversion::{ConversionJob, ConversionRecord, ConversionStatus};
pub use geometry::{BoundingBox, GeometryLod};
pub use id::*;
