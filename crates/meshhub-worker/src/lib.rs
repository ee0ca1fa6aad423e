//! Background job processing for MeshHub.
//!
//! This crate provides:
//! - A bounded worker pool that accepts jobs and runs them concurrently
//! - A job executor that dispatches jobs to the correct handler
//! - The CAD conversion job handler

pub mod executor;
pub mod job;
pub mod jobs;
pub mod pool;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use job::{JobAck, QueuedJob};
pub use pool::WorkerPool;
