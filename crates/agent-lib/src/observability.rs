//! Observability infrastructure for the host monitor
//!
//! Provides:
//! - Prometheus self-metrics (sampling latency, classification latency, alert counters)
//! - Structured logging with tracing, injected into every component

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{error, info, warn};

use crate::models::{AlertEvent, MetricSample};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

struct MonitorMetricsInner {
    sampling_latency_seconds: Histogram,
    classification_latency_seconds: Histogram,
    sampling_errors: IntCounter,
    anomalies_detected: IntCounter,
    classifications_skipped: IntCounter,
    threshold_breaches: IntCounter,
    alerts_dispatched: IntCounter,
    alerts_failed: IntCounter,
    model_trainings: IntCounter,
    model_loaded: IntGauge,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            sampling_latency_seconds: register_histogram!(
                "hostwatch_sampling_latency_seconds",
                "Time spent reading host metrics, including the CPU observation window",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register sampling_latency_seconds"),

            classification_latency_seconds: register_histogram!(
                "hostwatch_classification_latency_seconds",
                "Time spent scoring a sample against the anomaly model",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register classification_latency_seconds"),

            sampling_errors: register_int_counter!(
                "hostwatch_sampling_errors_total",
                "Total number of failed metric acquisitions"
            )
            .expect("Failed to register sampling_errors"),

            anomalies_detected: register_int_counter!(
                "hostwatch_anomalies_detected_total",
                "Total number of samples classified as anomalous"
            )
            .expect("Failed to register anomalies_detected"),

            classifications_skipped: register_int_counter!(
                "hostwatch_classifications_skipped_total",
                "Total number of classifications skipped for lack of a model or valid sample"
            )
            .expect("Failed to register classifications_skipped"),

            threshold_breaches: register_int_counter!(
                "hostwatch_threshold_breaches_total",
                "Total number of threshold breaches evaluated"
            )
            .expect("Failed to register threshold_breaches"),

            alerts_dispatched: register_int_counter!(
                "hostwatch_alerts_dispatched_total",
                "Total number of alerts delivered to the transport"
            )
            .expect("Failed to register alerts_dispatched"),

            alerts_failed: register_int_counter!(
                "hostwatch_alerts_failed_total",
                "Total number of alert deliveries that failed"
            )
            .expect("Failed to register alerts_failed"),

            model_trainings: register_int_counter!(
                "hostwatch_model_trainings_total",
                "Total number of anomaly model training runs"
            )
            .expect("Failed to register model_trainings"),

            model_loaded: register_int_gauge!(
                "hostwatch_model_loaded",
                "Whether an anomaly model is resident in memory (0 or 1)"
            )
            .expect("Failed to register model_loaded"),
        }
    }
}

/// Monitor metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_sampling_latency(&self, duration_secs: f64) {
        self.inner().sampling_latency_seconds.observe(duration_secs);
    }

    pub fn observe_classification_latency(&self, duration_secs: f64) {
        self.inner()
            .classification_latency_seconds
            .observe(duration_secs);
    }

    pub fn inc_sampling_errors(&self) {
        self.inner().sampling_errors.inc();
    }

    pub fn inc_anomalies_detected(&self) {
        self.inner().anomalies_detected.inc();
    }

    pub fn inc_classifications_skipped(&self) {
        self.inner().classifications_skipped.inc();
    }

    pub fn inc_threshold_breaches(&self) {
        self.inner().threshold_breaches.inc();
    }

    pub fn inc_alerts_dispatched(&self) {
        self.inner().alerts_dispatched.inc();
    }

    pub fn inc_alerts_failed(&self) {
        self.inner().alerts_failed.inc();
    }

    pub fn inc_model_trainings(&self) {
        self.inner().model_trainings.inc();
    }

    pub fn set_model_loaded(&self, loaded: bool) {
        self.inner().model_loaded.set(i64::from(loaded));
    }
}

/// Structured logger for monitor events
///
/// Every component receives a clone at construction and reports its
/// operationally significant events through it.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::new("localhost")
    }
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Log agent startup
    pub fn log_startup(&self, version: &str, model_path: &Path) {
        info!(
            event = "agent_started",
            node = %self.node_name,
            agent_version = %version,
            model_path = %model_path.display(),
            "Host monitor started"
        );
    }

    /// Log agent shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Host monitor shutting down"
        );
    }

    pub fn log_sampling_failed(&self, error: &str) {
        error!(
            event = "sampling_failed",
            node = %self.node_name,
            error = %error,
            "Error fetching system metrics"
        );
    }

    pub fn log_model_missing(&self, path: &Path) {
        warn!(
            event = "model_missing",
            node = %self.node_name,
            path = %path.display(),
            "Model not found, training a new one"
        );
    }

    pub fn log_training_started(&self, path: &Path, samples: usize, trees: usize) {
        warn!(
            event = "model_training_started",
            node = %self.node_name,
            path = %path.display(),
            samples = samples,
            trees = trees,
            synthetic = true,
            "Training anomaly model with synthetic data"
        );
    }

    pub fn log_training_finished(&self, path: &Path, checksum: &str, elapsed_ms: u128) {
        info!(
            event = "model_training_finished",
            node = %self.node_name,
            path = %path.display(),
            checksum = %checksum,
            elapsed_ms = elapsed_ms,
            "Anomaly model trained and saved"
        );
    }

    pub fn log_training_failed(&self, path: &Path, error: &str) {
        error!(
            event = "model_training_failed",
            node = %self.node_name,
            path = %path.display(),
            error = %error,
            "Error training anomaly model"
        );
    }

    pub fn log_model_loaded(&self, path: &Path, checksum: &str) {
        info!(
            event = "model_loaded",
            node = %self.node_name,
            path = %path.display(),
            checksum = %checksum,
            "Loaded anomaly model"
        );
    }

    pub fn log_model_load_failed(&self, path: &Path, error: &str) {
        error!(
            event = "model_load_failed",
            node = %self.node_name,
            path = %path.display(),
            error = %error,
            "Error loading anomaly model"
        );
    }

    pub fn log_classification_skipped(&self, reason: &str) {
        error!(
            event = "classification_skipped",
            node = %self.node_name,
            reason = %reason,
            "Anomaly detection skipped"
        );
    }

    pub fn log_anomaly(&self, sample: &MetricSample, score: f64) {
        warn!(
            event = "anomaly_detected",
            node = %self.node_name,
            cpu_usage = sample.cpu_usage,
            memory_usage = sample.memory_usage,
            load_avg = sample.load_avg,
            score = score,
            "Anomaly detected"
        );
    }

    pub fn log_threshold_breached(&self, alert: &AlertEvent) {
        info!(
            event = "threshold_breached",
            node = %self.node_name,
            metric = %alert.metric,
            value = alert.value,
            threshold = alert.threshold,
            "Threshold exceeded"
        );
    }

    pub fn log_alert_sent(&self, alert: &AlertEvent, transport: &str) {
        info!(
            event = "alert_sent",
            node = %self.node_name,
            metric = %alert.metric,
            value = alert.value,
            transport = %transport,
            "Alert sent successfully"
        );
    }

    pub fn log_alert_skipped(&self, alert: &AlertEvent, reason: &str) {
        warn!(
            event = "alert_skipped",
            node = %self.node_name,
            metric = %alert.metric,
            reason = %reason,
            "Skipping alert"
        );
    }

    pub fn log_alert_failed(&self, alert: &AlertEvent, transport: &str, error: &str) {
        error!(
            event = "alert_failed",
            node = %self.node_name,
            metric = %alert.metric,
            value = alert.value,
            threshold = alert.threshold,
            transport = %transport,
            error = %error,
            "Failed to send alert"
        );
    }
}
