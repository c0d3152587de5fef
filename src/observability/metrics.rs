//! Process-wide counters for the A2A route, the ratings pipeline and tools
//!
//! Counters are atomics; request latencies sit behind a mutex and are kept to
//! the most recent window.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const LATENCY_WINDOW: usize = 1000;

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

pub struct MetricsCollector {
    requests_received: AtomicU64,
    requests_completed: AtomicU64,
    requests_rejected: AtomicU64,
    requests_failed: AtomicU64,
    request_times: Mutex<Vec<u64>>,

    pipeline_runs_started: AtomicU64,
    pipeline_runs_completed: AtomicU64,
    pipeline_runs_failed: AtomicU64,
    items_fetched: AtomicU64,
    items_failed: AtomicU64,
    records_stored: AtomicU64,

    tool_calls: AtomicU64,
    started_at: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            requests_received: AtomicU64::new(0),
            requests_completed: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            request_times: Mutex::new(Vec::new()),
            pipeline_runs_started: AtomicU64::new(0),
            pipeline_runs_completed: AtomicU64::new(0),
            pipeline_runs_failed: AtomicU64::new(0),
            items_fetched: AtomicU64::new(0),
            items_failed: AtomicU64::new(0),
            records_stored: AtomicU64::new(0),
            tool_calls: AtomicU64::new(0),
            started_at: current_timestamp(),
        }
    }

    // A2A requests
    pub fn request_received(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_completed(&self, duration: Duration) {
        self.requests_completed.fetch_add(1, Ordering::Relaxed);
        self.record_request_time(duration);
    }

    /// Envelope or params validation failed before the agent ran
    pub fn request_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_failed(&self, duration: Duration) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        self.record_request_time(duration);
    }

    fn record_request_time(&self, duration: Duration) {
        if let Ok(mut times) = self.request_times.lock() {
            times.push(duration.as_millis() as u64);
            if times.len() > LATENCY_WINDOW {
                times.remove(0);
            }
        }
    }

    // Pipeline
    pub fn pipeline_started(&self) {
        self.pipeline_runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pipeline_completed(&self) {
        self.pipeline_runs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pipeline_failed(&self) {
        self.pipeline_runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn item_fetched(&self, success: bool) {
        if success {
            self.items_fetched.fetch_add(1, Ordering::Relaxed);
        } else {
            self.items_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn records_stored(&self, count: usize) {
        self.records_stored
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    // Tools
    pub fn tool_call(&self) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Average, p50 and p95 request latency in milliseconds
    fn latency_statistics(&self) -> (f64, f64, f64) {
        let Ok(times) = self.request_times.lock() else {
            return (0.0, 0.0, 0.0);
        };
        if times.is_empty() {
            return (0.0, 0.0, 0.0);
        }

        let mut sorted = times.clone();
        sorted.sort_unstable();
        let avg = sorted.iter().sum::<u64>() as f64 / sorted.len() as f64;
        (avg, percentile(&sorted, 50.0), percentile(&sorted, 95.0))
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = current_timestamp();
        let (avg, p50, p95) = self.latency_statistics();

        MetricsSnapshot {
            timestamp: now,
            uptime_seconds: now.saturating_sub(self.started_at),
            requests: RequestMetrics {
                received: self.requests_received.load(Ordering::Relaxed),
                completed: self.requests_completed.load(Ordering::Relaxed),
                rejected: self.requests_rejected.load(Ordering::Relaxed),
                failed: self.requests_failed.load(Ordering::Relaxed),
                avg_duration_ms: avg,
                p50_duration_ms: p50,
                p95_duration_ms: p95,
            },
            pipeline: PipelineMetrics {
                runs_started: self.pipeline_runs_started.load(Ordering::Relaxed),
                runs_completed: self.pipeline_runs_completed.load(Ordering::Relaxed),
                runs_failed: self.pipeline_runs_failed.load(Ordering::Relaxed),
                items_fetched: self.items_fetched.load(Ordering::Relaxed),
                items_failed: self.items_failed.load(Ordering::Relaxed),
                records_stored: self.records_stored.load(Ordering::Relaxed),
            },
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: u64,
    pub uptime_seconds: u64,
    pub requests: RequestMetrics,
    pub pipeline: PipelineMetrics,
    pub tool_calls: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestMetrics {
    pub received: u64,
    pub completed: u64,
    pub rejected: u64,
    pub failed: u64,
    pub avg_duration_ms: f64,
    pub p50_duration_ms: f64,
    pub p95_duration_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineMetrics {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub items_fetched: u64,
    pub items_failed: u64,
    pub records_stored: u64,
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Linear-interpolated percentile over already sorted data
fn percentile(sorted_data: &[u64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let index = (percentile / 100.0) * (sorted_data.len() - 1) as f64;
    let lower = sorted_data[index.floor() as usize] as f64;
    let upper = sorted_data[index.ceil() as usize] as f64;
    lower + (upper - lower) * index.fract()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_request_metrics() {
        let collector = MetricsCollector::new();
        collector.request_received();
        collector.request_received();
        collector.request_completed(Duration::from_millis(20));
        collector.request_rejected();

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.requests.received, 2);
        assert_eq!(snapshot.requests.completed, 1);
        assert_eq!(snapshot.requests.rejected, 1);
        assert_eq!(snapshot.requests.failed, 0);
        assert_eq!(snapshot.requests.avg_duration_ms, 20.0);
    }

    #[test]
    fn test_pipeline_metrics() {
        let collector = MetricsCollector::new();
        collector.pipeline_started();
        collector.item_fetched(true);
        collector.item_fetched(false);
        collector.records_stored(1);
        collector.pipeline_completed();

        let pipeline = collector.snapshot().pipeline;
        assert_eq!(pipeline.runs_started, 1);
        assert_eq!(pipeline.runs_completed, 1);
        assert_eq!(pipeline.items_fetched, 1);
        assert_eq!(pipeline.items_failed, 1);
        assert_eq!(pipeline.records_stored, 1);
    }

    #[test]
    fn test_thread_safety() {
        let collector = Arc::new(MetricsCollector::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let collector = Arc::clone(&collector);
                thread::spawn(move || {
                    for _ in 0..100 {
                        collector.tool_call();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(collector.snapshot().tool_calls, 800);
    }

    #[test]
    fn test_percentile_calculation() {
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        assert_eq!(percentile(&data, 0.0), 1.0);
        assert_eq!(percentile(&data, 100.0), 10.0);
        assert_eq!(percentile(&data, 50.0), 5.5);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_latency_window_is_bounded() {
        let collector = MetricsCollector::new();
        for _ in 0..(LATENCY_WINDOW + 10) {
            collector.request_completed(Duration::from_millis(1));
        }
        assert_eq!(collector.request_times.lock().unwrap().len(), LATENCY_WINDOW);
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(MetricsCollector::new().snapshot()).unwrap();
        assert!(json["requests"]["received"].is_u64());
        assert!(json["pipeline"]["runs_started"].is_u64());
    }
}
