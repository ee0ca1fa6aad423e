//! Metadata service implementations.

pub mod memory;

pub use memory::InMemoryMetadataService;
