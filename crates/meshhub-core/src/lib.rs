//! # meshhub-core
//!
//! Core crate for MeshHub. Contains the collaborator traits consumed by the
//! conversion pipeline (artifact store, metadata service, conversion service),
//! configuration schemas, domain types for conversion records and geometry
//! LODs, and the unified error system.
//!
//! This crate has **no** internal dependencies on other MeshHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
