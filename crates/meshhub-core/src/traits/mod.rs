//! Core traits defined in `meshhub-core` and implemented by other crates.

pub mod conversion;
pub mod metadata;
pub mod store;

pub use conversion::ConversionService;
pub use metadata::MetadataService;
pub use store::{ArtifactStore, ByteStream};
