//! Built-in job handler implementations.

pub mod conversion;

pub use conversion::{CONVERSION_JOB_TYPE, ConversionJobHandler};
