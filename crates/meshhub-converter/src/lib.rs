//! # meshhub-converter
//!
//! Converts CAD sources (IFC, STEP/IGES) into triangulated OBJ meshes at
//! several levels of detail by driving external native tools.
//!
//! The [`ConversionOrchestrator`] owns the per-artifact state machine and
//! runs each job through staging, format conversion, bounding-box analysis,
//! decimation and persistence. Every job gets a private staging directory
//! that is removed on all exit paths.

pub mod converters;
pub mod decimator;
pub mod error;
pub mod executor;
pub mod geometry;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod staging;

pub use converters::{CadConverter, ConverterRegistry};
pub use error::{ConversionError, ConversionErrorKind};
pub use orchestrator::ConversionOrchestrator;
