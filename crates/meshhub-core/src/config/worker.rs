//! Background worker configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Background job worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of jobs processed concurrently.
    #[serde(default = "default_concurrency")]
    #[validate(range(min = 1, max = 64))]
    pub concurrency: usize,
    /// Maximum number of submitted jobs waiting for a worker slot.
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, max = 10000))]
    pub queue_capacity: usize,
    /// Seconds to wait for in-flight jobs on shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            concurrency: default_concurrency(),
            queue_capacity: default_queue_capacity(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}

fn default_shutdown_grace() -> u64 {
    30
}
