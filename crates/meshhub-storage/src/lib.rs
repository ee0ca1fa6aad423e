//! # meshhub-storage
//!
//! Collaborator implementations for the conversion pipeline: a local
//! filesystem artifact store and an in-memory metadata service.

pub mod local;
pub mod metadata;

pub use local::LocalArtifactStore;
pub use metadata::InMemoryMetadataService;
