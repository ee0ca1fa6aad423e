//! Worker pool: bounded queue plus a concurrency limit.
//!
//! Submitters get a [`JobAck`] as soon as the job is queued. A dispatcher
//! task takes jobs off the queue, waits for a free slot and spawns one task
//! per job. No job is retried.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing;

use meshhub_core::config::WorkerConfig;
use meshhub_core::error::AppError;
use meshhub_core::result::AppResult;

use crate::executor::{JobExecutionError, JobExecutor};
use crate::job::{JobAck, QueuedJob};

/// Bounded pool executing submitted jobs in the background.
#[derive(Debug)]
pub struct WorkerPool {
    sender: mpsc::Sender<QueuedJob>,
    dispatcher: JoinHandle<()>,
    slots: Arc<Semaphore>,
    config: WorkerConfig,
}

impl WorkerPool {
    /// Start the dispatcher on the current runtime.
    pub fn start(executor: Arc<JobExecutor>, config: WorkerConfig) -> Self {
        let concurrency = config.concurrency.max(1);
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let slots = Arc::new(Semaphore::new(concurrency));

        tracing::info!(
            concurrency,
            queue_capacity = config.queue_capacity,
            handlers = ?executor.registered_types(),
            "Worker pool started"
        );

        let dispatcher = tokio::spawn(dispatch(receiver, executor, slots.clone()));

        Self {
            sender,
            dispatcher,
            slots,
            config,
        }
    }

    /// Queue a job, waiting for queue space if necessary.
    pub async fn submit(&self, job_type: &str, payload: Value) -> AppResult<JobAck> {
        let job = QueuedJob::new(job_type, payload);
        let ack = job.ack();
        self.sender
            .send(job)
            .await
            .map_err(|_| AppError::service_unavailable("Worker pool is shut down"))?;
        tracing::debug!(job_id = %ack.job_id, job_type, "Job queued");
        Ok(ack)
    }

    /// Queue a job without waiting. Fails with `ServiceUnavailable` when the
    /// queue is full.
    pub fn try_submit(&self, job_type: &str, payload: Value) -> AppResult<JobAck> {
        let job = QueuedJob::new(job_type, payload);
        let ack = job.ack();
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AppError::service_unavailable(format!(
                "Worker queue is full ({} jobs)",
                self.config.queue_capacity
            )),
            mpsc::error::TrySendError::Closed(_) => {
                AppError::service_unavailable("Worker pool is shut down")
            }
        })?;
        tracing::debug!(job_id = %ack.job_id, job_type, "Job queued");
        Ok(ack)
    }

    /// Close the queue, let queued jobs run, and wait for all of them up to
    /// the configured grace period. Returns `false` if the grace period ran
    /// out first.
    pub async fn shutdown(self) -> bool {
        let Self {
            sender,
            mut dispatcher,
            slots,
            config,
        } = self;
        drop(sender);

        let grace = Duration::from_secs(config.shutdown_grace_seconds);
        let permits = config.concurrency.max(1) as u32;

        tracing::info!("Worker pool waiting for in-flight jobs to complete...");

        let drained = tokio::time::timeout(grace, async {
            let _ = (&mut dispatcher).await;
            let _ = slots.acquire_many(permits).await;
        })
        .await
        .is_ok();

        if drained {
            tracing::info!("Worker pool shut down complete");
        } else {
            dispatcher.abort();
            tracing::warn!(
                grace_s = config.shutdown_grace_seconds,
                "Worker pool shutdown grace period elapsed with jobs still running"
            );
        }
        drained
    }
}

async fn dispatch(
    mut receiver: mpsc::Receiver<QueuedJob>,
    executor: Arc<JobExecutor>,
    slots: Arc<Semaphore>,
) {
    while let Some(job) = receiver.recv().await {
        let Ok(permit) = slots.clone().acquire_owned().await else {
            tracing::error!("Worker slot semaphore closed, stopping dispatcher");
            break;
        };
        let executor = Arc::clone(&executor);

        tokio::spawn(async move {
            let _permit = permit;
            run_job(&executor, job).await;
        });
    }
}

async fn run_job(executor: &JobExecutor, job: QueuedJob) {
    let job_id = job.id;
    match executor.execute(&job).await {
        Ok(result) => {
            tracing::info!(%job_id, job_type = %job.job_type, result = ?result, "Job completed");
        }
        Err(JobExecutionError::Transient(msg)) => {
            tracing::warn!(%job_id, "Job failed (transient, not retried): {}", msg);
        }
        Err(JobExecutionError::Permanent(msg)) => {
            tracing::error!(%job_id, "Job failed permanently: {}", msg);
        }
        Err(JobExecutionError::Internal(err)) => {
            tracing::error!(%job_id, "Job internal error: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::JobHandler;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct Tracking {
        running: AtomicUsize,
        max_running: AtomicUsize,
        done: AtomicUsize,
    }

    #[async_trait]
    impl JobHandler for Tracking {
        fn job_type(&self) -> &str {
            "track"
        }

        async fn execute(&self, _job: &QueuedJob) -> Result<Option<Value>, JobExecutionError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.done.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    #[derive(Debug)]
    struct Gated {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl JobHandler for Gated {
        fn job_type(&self) -> &str {
            "gated"
        }

        async fn execute(&self, _job: &QueuedJob) -> Result<Option<Value>, JobExecutionError> {
            let _pass = self
                .gate
                .acquire()
                .await
                .map_err(|e| JobExecutionError::Transient(e.to_string()))?;
            Ok(None)
        }
    }

    fn config(concurrency: usize, queue_capacity: usize) -> WorkerConfig {
        WorkerConfig {
            enabled: true,
            concurrency,
            queue_capacity,
            shutdown_grace_seconds: 10,
        }
    }

    #[tokio::test]
    async fn test_all_jobs_run_within_concurrency_limit() {
        let handler = Arc::new(Tracking::default());
        let mut executor = JobExecutor::new();
        executor.register(handler.clone());
        let pool = WorkerPool::start(Arc::new(executor), config(2, 16));

        for _ in 0..10 {
            pool.submit("track", Value::Null).await.unwrap();
        }
        assert!(pool.shutdown().await);

        assert_eq!(handler.done.load(Ordering::SeqCst), 10);
        assert!(handler.max_running.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_try_submit_fails_fast_when_full() {
        let gate = Arc::new(Semaphore::new(0));
        let mut executor = JobExecutor::new();
        executor.register(Arc::new(Gated { gate: gate.clone() }));
        let pool = WorkerPool::start(Arc::new(executor), config(1, 1));

        let mut rejected = None;
        for _ in 0..10 {
            match pool.try_submit("gated", Value::Null) {
                Ok(_) => tokio::task::yield_now().await,
                Err(e) => {
                    rejected = Some(e);
                    break;
                }
            }
        }
        let err = rejected.expect("queue should fill up");
        assert_eq!(err.kind, meshhub_core::error::ErrorKind::ServiceUnavailable);

        gate.add_permits(100);
        assert!(pool.shutdown().await);
    }

    #[tokio::test]
    async fn test_unknown_job_type_does_not_stop_pool() {
        let handler = Arc::new(Tracking::default());
        let mut executor = JobExecutor::new();
        executor.register(handler.clone());
        let pool = WorkerPool::start(Arc::new(executor), config(1, 4));

        pool.submit("unknown", Value::Null).await.unwrap();
        let ack = pool.submit("track", Value::Null).await.unwrap();
        assert_eq!(ack.job_type, "track");
        assert!(pool.shutdown().await);
        assert_eq!(handler.done.load(Ordering::SeqCst), 1);
    }
}
