//! Request counting and latency statistics for the prediction service.

use crate::types::prediction::ChurnLabel;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Latency samples kept for percentile reporting
const LATENCY_WINDOW: usize = 10_000;

/// Process-wide service metrics, shared by every request handler
pub struct ServiceMetrics {
    /// Successful predictions; the value served by `/stats`
    request_count: AtomicU64,
    /// Requests rejected before encoding
    validation_failures: AtomicU64,
    /// Requests that failed inside the classifier
    prediction_failures: AtomicU64,
    churn_predictions: AtomicU64,
    no_churn_predictions: AtomicU64,
    /// Summary lines written by `print_summary`
    summaries_logged: AtomicU64,
    /// Encode + predict latency (in microseconds)
    latencies: RwLock<Vec<u64>>,
    start_time: Instant,
    started_at: DateTime<Utc>,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            request_count: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            prediction_failures: AtomicU64::new(0),
            churn_predictions: AtomicU64::new(0),
            no_churn_predictions: AtomicU64::new(0),
            summaries_logged: AtomicU64::new(0),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Record a successful prediction. Returns the updated request count.
    pub fn record_prediction(&self, label: ChurnLabel, latency: Duration) -> u64 {
        match label {
            ChurnLabel::Churn => self.churn_predictions.fetch_add(1, Ordering::Relaxed),
            ChurnLabel::NoChurn => self.no_churn_predictions.fetch_add(1, Ordering::Relaxed),
        };

        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            if times.len() > LATENCY_WINDOW {
                times.drain(0..LATENCY_WINDOW / 2);
            }
        }

        self.request_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_prediction_failure(&self) {
        self.prediction_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn validation_failures(&self) -> u64 {
        self.validation_failures.load(Ordering::Relaxed)
    }

    pub fn prediction_failures(&self) -> u64 {
        self.prediction_failures.load(Ordering::Relaxed)
    }

    pub fn summaries_logged(&self) -> u64 {
        self.summaries_logged.load(Ordering::Relaxed)
    }

    /// Fraction of successful predictions labelled churn
    pub fn churn_rate(&self) -> f64 {
        let total = self.request_count();
        if total == 0 {
            return 0.0;
        }
        self.churn_predictions.load(Ordering::Relaxed) as f64 / total as f64
    }

    /// Get latency statistics over the retained window
    pub fn get_latency_stats(&self) -> LatencyStats {
        let times = match self.latencies.read() {
            Ok(times) => times,
            Err(_) => return LatencyStats::default(),
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        drop(times);
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.50),
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Successful predictions per second since start
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.request_count() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let latency = self.get_latency_stats();
        self.summaries_logged.fetch_add(1, Ordering::Relaxed);

        info!(
            since = %self.started_at.to_rfc3339(),
            request_count = self.request_count(),
            churn = self.churn_predictions.load(Ordering::Relaxed),
            no_churn = self.no_churn_predictions.load(Ordering::Relaxed),
            churn_rate = format!("{:.1}%", self.churn_rate() * 100.0),
            validation_failures = self.validation_failures(),
            prediction_failures = self.prediction_failures(),
            throughput = format!("{:.2} req/s", self.get_throughput()),
            "Prediction service summary"
        );
        info!(
            samples = latency.count,
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            p99_us = latency.p99_us,
            max_us = latency.max_us,
            "Prediction latency"
        );
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Prediction latency statistics
#[derive(Debug, Default, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodic metrics summary logger
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_recording() {
        let metrics = ServiceMetrics::new();

        assert_eq!(
            metrics.record_prediction(ChurnLabel::Churn, Duration::from_micros(100)),
            1
        );
        assert_eq!(
            metrics.record_prediction(ChurnLabel::NoChurn, Duration::from_micros(300)),
            2
        );

        assert_eq!(metrics.request_count(), 2);
        assert_eq!(metrics.churn_rate(), 0.5);
    }

    #[test]
    fn test_failures_do_not_count_as_requests() {
        let metrics = ServiceMetrics::new();
        metrics.record_validation_failure();
        metrics.record_prediction_failure();

        assert_eq!(metrics.request_count(), 0);
        assert_eq!(metrics.validation_failures(), 1);
        assert_eq!(metrics.prediction_failures(), 1);
        assert_eq!(metrics.churn_rate(), 0.0);
    }

    #[test]
    fn test_latency_stats() {
        let metrics = ServiceMetrics::new();
        assert_eq!(metrics.get_latency_stats(), LatencyStats::default());

        for us in [100, 200, 300, 400] {
            metrics.record_prediction(ChurnLabel::NoChurn, Duration::from_micros(us));
        }

        let stats = metrics.get_latency_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.p50_us, 300);
        assert_eq!(stats.max_us, 400);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let metrics = Arc::new(ServiceMetrics::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        metrics.record_prediction(ChurnLabel::Churn, Duration::from_micros(1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.request_count(), 4000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_logs_once_per_interval() {
        let metrics = Arc::new(ServiceMetrics::new());
        let reporter = MetricsReporter::new(metrics.clone(), 30);
        let handle = tokio::spawn(reporter.start());

        // Nothing on the immediate first tick
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(metrics.summaries_logged(), 0);

        tokio::time::sleep(Duration::from_secs(66)).await;
        assert_eq!(metrics.summaries_logged(), 3);
        assert!(!handle.is_finished());

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_zero_interval_clamped_to_one_second() {
        let metrics = Arc::new(ServiceMetrics::new());
        let handle = tokio::spawn(MetricsReporter::new(metrics.clone(), 0).start());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(metrics.summaries_logged(), 2);

        handle.abort();
    }
}
