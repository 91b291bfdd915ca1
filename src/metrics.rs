//! Request and inference statistics for the question-answering service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::info;

/// Latency samples kept per series
const MAX_SAMPLES: usize = 10000;

/// Metrics collector shared by the gate and the extractor
pub struct QaMetrics {
    /// Requests that reached a worker
    requests_started: AtomicU64,
    /// Requests that produced an answer
    answered: AtomicU64,
    /// Requests stopped at a cancellation checkpoint
    cancelled: AtomicU64,
    /// Requests that failed for any other reason
    failed: AtomicU64,
    /// Requests rejected because no model was loaded
    not_ready: AtomicU64,
    /// End-to-end request times (in microseconds)
    request_times: RwLock<Vec<u64>>,
    /// Model run times (in microseconds)
    inference_times: RwLock<Vec<u64>>,
    /// Time spent waiting for the gate (in microseconds)
    lock_wait_times: RwLock<Vec<u64>>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests_started: u64,
    pub answered: u64,
    pub cancelled: u64,
    pub failed: u64,
    pub not_ready: u64,
}

impl QaMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_started: AtomicU64::new(0),
            answered: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            not_ready: AtomicU64::new(0),
            request_times: RwLock::new(Vec::with_capacity(1000)),
            inference_times: RwLock::new(Vec::with_capacity(1000)),
            lock_wait_times: RwLock::new(Vec::with_capacity(1000)),
        }
    }

    pub fn record_request(&self) {
        self.requests_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_answered(&self, request_time: Duration) {
        self.answered.fetch_add(1, Ordering::Relaxed);
        push_sample(&self.request_times, request_time);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_ready(&self) {
        self.not_ready.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inference(&self, duration: Duration) {
        push_sample(&self.inference_times, duration);
    }

    pub fn record_lock_wait(&self, duration: Duration) {
        push_sample(&self.lock_wait_times, duration);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_started: self.requests_started.load(Ordering::Relaxed),
            answered: self.answered.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            not_ready: self.not_ready.load(Ordering::Relaxed),
        }
    }

    pub fn get_request_stats(&self) -> LatencyStats {
        LatencyStats::from_samples(&self.request_times)
    }

    pub fn get_inference_stats(&self) -> LatencyStats {
        LatencyStats::from_samples(&self.inference_times)
    }

    pub fn get_lock_wait_stats(&self) -> LatencyStats {
        LatencyStats::from_samples(&self.lock_wait_times)
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let counts = self.snapshot();
        let request = self.get_request_stats();
        let inference = self.get_inference_stats();
        let lock_wait = self.get_lock_wait_stats();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              QUESTION ANSWERING - METRICS SUMMARY            ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Requests: {:>6}  Answered: {:>6}  Cancelled: {:>6}         ║",
            counts.requests_started, counts.answered, counts.cancelled
        );
        info!(
            "║ Failed:   {:>6}  Not ready: {:>5}                            ║",
            counts.failed, counts.not_ready
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        for (label, stats) in [
            ("Request", &request),
            ("Inference", &inference),
            ("Lock wait", &lock_wait),
        ] {
            info!(
                "║ {:<9} (μs): mean={:>7} p50={:>7} p95={:>7} p99={:>7} max={:>7}",
                label, stats.mean_us, stats.p50_us, stats.p95_us, stats.p99_us, stats.max_us
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for QaMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn push_sample(series: &RwLock<Vec<u64>>, duration: Duration) {
    if let Ok(mut times) = series.write() {
        times.push(duration.as_micros() as u64);
        // Keep only the most recent samples for memory efficiency
        if times.len() > MAX_SAMPLES {
            times.drain(0..MAX_SAMPLES / 2);
        }
    }
}

/// Latency statistics for one series
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

impl LatencyStats {
    fn from_samples(series: &RwLock<Vec<u64>>) -> Self {
        let mut sorted = match series.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return Self::default(),
        };
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        Self {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }
}
