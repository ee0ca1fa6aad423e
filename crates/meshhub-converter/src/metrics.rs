//! Conversion metrics and telemetry.
//!
//! Tracks job outcomes, subprocess spawns and durations. Counters are
//! atomics; duration samples sit behind a mutex.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Maximum number of duration samples to keep in memory.
const MAX_DURATION_SAMPLES: usize = 1000;

/// Conversion metrics collector.
///
/// All operations are thread-safe and suitable for concurrent access
/// from multiple conversion jobs.
#[derive(Debug)]
pub struct ConversionMetrics {
    /// Jobs that created a pending record.
    pub conversions_started: AtomicU64,
    /// Jobs finalized as succeeded.
    pub conversions_succeeded: AtomicU64,
    /// Jobs finalized as failed.
    pub conversions_failed: AtomicU64,
    /// Jobs skipped because a conversion was already pending.
    pub conversions_skipped: AtomicU64,
    /// Jobs rejected for an unsupported source extension.
    pub unsupported_formats: AtomicU64,
    /// External tool processes spawned.
    pub tools_spawned: AtomicU64,
    /// Decimation runs that fell back to the single full-quality LOD.
    pub decimation_fallbacks: AtomicU64,
    /// LOD meshes written to the artifact store.
    pub lods_persisted: AtomicU64,
    /// Total bytes written to the artifact store.
    pub total_output_bytes: AtomicU64,
    /// Recent job durations (kept for P50/P95/P99 calculations).
    duration_samples: Mutex<Vec<Duration>>,
}

impl ConversionMetrics {
    /// Create a new empty metrics collector.
    pub fn new() -> Self {
        Self {
            conversions_started: AtomicU64::new(0),
            conversions_succeeded: AtomicU64::new(0),
            conversions_failed: AtomicU64::new(0),
            conversions_skipped: AtomicU64::new(0),
            unsupported_formats: AtomicU64::new(0),
            tools_spawned: AtomicU64::new(0),
            decimation_fallbacks: AtomicU64::new(0),
            lods_persisted: AtomicU64::new(0),
            total_output_bytes: AtomicU64::new(0),
            duration_samples: Mutex::new(Vec::with_capacity(MAX_DURATION_SAMPLES)),
        }
    }

    /// Record a conversion start.
    pub fn record_started(&self) {
        self.conversions_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful conversion with its duration.
    pub fn record_success(&self, duration: Duration) {
        self.conversions_succeeded.fetch_add(1, Ordering::Relaxed);
        self.add_duration_sample(duration);
    }

    /// Record a failed conversion with its duration.
    pub fn record_failure(&self, duration: Duration) {
        self.conversions_failed.fetch_add(1, Ordering::Relaxed);
        self.add_duration_sample(duration);
    }

    /// Record a job skipped because its key was already pending.
    pub fn record_skipped(&self) {
        self.conversions_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job whose source had no matching converter.
    pub fn record_unsupported(&self) {
        self.unsupported_formats.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one external process spawn.
    pub fn record_spawn(&self) {
        self.tools_spawned.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a decimation fallback.
    pub fn record_decimation_fallback(&self) {
        self.decimation_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one persisted LOD of `bytes` size.
    pub fn record_lod_persisted(&self, bytes: u64) {
        self.lods_persisted.fetch_add(1, Ordering::Relaxed);
        self.total_output_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Add a duration sample, evicting the oldest if at capacity.
    fn add_duration_sample(&self, duration: Duration) {
        if let Ok(mut samples) = self.duration_samples.lock() {
            if samples.len() >= MAX_DURATION_SAMPLES {
                samples.remove(0);
            }
            samples.push(duration);
        }
    }

    /// Get the current snapshot of metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let durations = self
            .duration_samples
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default();

        let (p50, p95, p99) = Self::calculate_percentiles(&durations);

        MetricsSnapshot {
            conversions_started: self.conversions_started.load(Ordering::Relaxed),
            conversions_succeeded: self.conversions_succeeded.load(Ordering::Relaxed),
            conversions_failed: self.conversions_failed.load(Ordering::Relaxed),
            conversions_skipped: self.conversions_skipped.load(Ordering::Relaxed),
            unsupported_formats: self.unsupported_formats.load(Ordering::Relaxed),
            tools_spawned: self.tools_spawned.load(Ordering::Relaxed),
            decimation_fallbacks: self.decimation_fallbacks.load(Ordering::Relaxed),
            lods_persisted: self.lods_persisted.load(Ordering::Relaxed),
            total_output_bytes: self.total_output_bytes.load(Ordering::Relaxed),
            duration_p50_ms: p50.map(|d| d.as_millis() as u64),
            duration_p95_ms: p95.map(|d| d.as_millis() as u64),
            duration_p99_ms: p99.map(|d| d.as_millis() as u64),
            sample_count: durations.len() as u64,
        }
    }

    /// Calculate P50/P95/P99 from a list of durations.
    fn calculate_percentiles(
        durations: &[Duration],
    ) -> (Option<Duration>, Option<Duration>, Option<Duration>) {
        if durations.is_empty() {
            return (None, None, None);
        }

        let mut sorted = durations.to_vec();
        sorted.sort();
        let len = sorted.len();

        let p50 = sorted.get(len * 50 / 100).copied();
        let p95 = sorted.get(len * 95 / 100).copied();
        let p99 = sorted.get(len.saturating_sub(1) * 99 / 100).copied();

        (p50, p95, p99)
    }
}

impl Default for ConversionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of conversion metrics.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    /// Jobs that created a pending record.
    pub conversions_started: u64,
    /// Jobs finalized as succeeded.
    pub conversions_succeeded: u64,
    /// Jobs finalized as failed.
    pub conversions_failed: u64,
    /// Jobs skipped because a conversion was pending.
    pub conversions_skipped: u64,
    /// Jobs rejected for an unsupported extension.
    pub unsupported_formats: u64,
    /// External processes spawned.
    pub tools_spawned: u64,
    /// Decimation fallbacks.
    pub decimation_fallbacks: u64,
    /// LOD meshes persisted.
    pub lods_persisted: u64,
    /// Bytes written to the store.
    pub total_output_bytes: u64,
    /// P50 job duration in milliseconds.
    pub duration_p50_ms: Option<u64>,
    /// P95 job duration in milliseconds.
    pub duration_p95_ms: Option<u64>,
    /// P99 job duration in milliseconds.
    pub duration_p99_ms: Option<u64>,
    /// Number of duration samples collected.
    pub sample_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counting() {
        let m = ConversionMetrics::new();
        m.record_started();
        m.record_started();
        m.record_success(Duration::from_secs(5));
        m.record_failure(Duration::from_secs(1));
        m.record_spawn();
        m.record_lod_persisted(1000);

        let snap = m.snapshot();
        assert_eq!(snap.conversions_started, 2);
        assert_eq!(snap.conversions_succeeded, 1);
        assert_eq!(snap.conversions_failed, 1);
        assert_eq!(snap.tools_spawned, 1);
        assert_eq!(snap.total_output_bytes, 1000);
        assert_eq!(snap.sample_count, 2);
    }

    #[test]
    fn test_metrics_percentiles() {
        let m = ConversionMetrics::new();
        for i in 1..=100 {
            m.record_success(Duration::from_millis(i * 10));
        }

        let snap = m.snapshot();
        let p50 = snap.duration_p50_ms.expect("p50");
        let p95 = snap.duration_p95_ms.expect("p95");
        assert!(p95 > p50);
        assert!(snap.duration_p99_ms.is_some());
    }

    #[test]
    fn test_metrics_empty_percentiles() {
        let snap = ConversionMetrics::new().snapshot();
        assert!(snap.duration_p50_ms.is_none());
        assert!(snap.duration_p99_ms.is_none());
    }

    #[test]
    fn test_sample_window_is_bounded() {
        let m = ConversionMetrics::new();
        for _ in 0..(MAX_DURATION_SAMPLES + 10) {
            m.record_success(Duration::from_millis(1));
        }
        assert_eq!(m.snapshot().sample_count, MAX_DURATION_SAMPLES as u64);
    }
}
