//! Core data models for the host monitor

use serde::{Deserialize, Serialize};

/// Number of features fed to the anomaly model
pub const NUM_FEATURES: usize = 3;

/// Feature vector in model order: `[cpu_usage, memory_usage, load_avg]`
pub type FeatureVector = [f64; NUM_FEATURES];

/// One instantaneous reading of host resource usage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// CPU utilization percentage (0-100)
    pub cpu_usage: f64,
    /// Memory utilization percentage (0-100)
    pub memory_usage: f64,
    /// 1-minute load average
    pub load_avg: f64,
    /// Whether the platform provides a load average at all
    #[serde(skip, default = "default_load_available")]
    pub load_available: bool,
}

fn default_load_available() -> bool {
    true
}

impl MetricSample {
    /// Build a sample; non-finite readings are replaced by 0.0
    pub fn new(cpu_usage: f64, memory_usage: f64, load_avg: f64) -> Self {
        Self {
            cpu_usage: finite_or_zero(cpu_usage),
            memory_usage: finite_or_zero(memory_usage),
            load_avg: finite_or_zero(load_avg),
            load_available: true,
        }
    }

    /// Build a sample on a platform without load average support
    pub fn without_load(cpu_usage: f64, memory_usage: f64) -> Self {
        Self {
            load_available: false,
            ..Self::new(cpu_usage, memory_usage, 0.0)
        }
    }

    /// Features in the order the model was trained on
    pub fn features(&self) -> FeatureVector {
        [self.cpu_usage, self.memory_usage, self.load_avg]
    }

    /// Check the fields are finite and within their documented ranges
    pub fn is_valid(&self) -> bool {
        let pct = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
        pct(self.cpu_usage)
            && pct(self.memory_usage)
            && self.load_avg.is_finite()
            && self.load_avg >= 0.0
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Metric a threshold applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Cpu,
    Memory,
    Load,
}

impl MetricKind {
    /// Human-readable name used in alert messages
    pub fn display_name(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "CPU Usage",
            MetricKind::Memory => "Memory Usage",
            MetricKind::Load => "Load Average",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A single threshold breach, built and dispatched once
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub metric: MetricKind,
    pub value: f64,
    pub threshold: f64,
}

/// Successful evaluation returned to HTTP clients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub load_avg: f64,
    pub anomaly_detected: bool,
}

impl MetricsReport {
    pub fn new(sample: &MetricSample, anomaly_detected: bool) -> Self {
        Self {
            cpu_usage: sample.cpu_usage,
            memory_usage: sample.memory_usage,
            load_avg: sample.load_avg,
            anomaly_detected,
        }
    }
}

/// Error body returned when sampling fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_finite_fields_become_zero() {
        let sample = MetricSample::new(f64::NAN, f64::INFINITY, 1.5);
        assert_eq!(sample.cpu_usage, 0.0);
        assert_eq!(sample.memory_usage, 0.0);
        assert_eq!(sample.load_avg, 1.5);
        assert!(sample.is_valid());
    }

    #[test]
    fn test_feature_order() {
        let sample = MetricSample::new(10.0, 20.0, 0.3);
        assert_eq!(sample.features(), [10.0, 20.0, 0.3]);
    }

    #[test]
    fn test_out_of_range_sample_is_invalid() {
        assert!(!MetricSample::new(120.0, 20.0, 0.3).is_valid());
        assert!(!MetricSample::new(10.0, 20.0, -1.0).is_valid());
    }

    #[test]
    fn test_report_serialization_skips_load_flag() {
        let sample = MetricSample::without_load(12.5, 40.0);
        let json = serde_json::to_value(sample).unwrap();
        assert!(json.get("load_available").is_none());

        let report = MetricsReport::new(&sample, true);
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["cpu_usage"], 12.5);
        assert_eq!(json["load_avg"], 0.0);
        assert_eq!(json["anomaly_detected"], true);
    }

    #[test]
    fn test_metric_display_names() {
        assert_eq!(MetricKind::Cpu.to_string(), "CPU Usage");
        assert_eq!(MetricKind::Memory.to_string(), "Memory Usage");
        assert_eq!(MetricKind::Load.to_string(), "Load Average");
    }
}
