//! Per-sample anomaly classification
//!
//! Classification never fails: a missing model or an unusable sample both
//! yield "not anomalous" and a logged skip.

use std::time::Instant;

use super::store::AnomalyModel;
use crate::models::MetricSample;
use crate::observability::{MonitorMetrics, StructuredLogger};

/// Decides whether a sample is an outlier relative to the trained model
#[derive(Clone)]
pub struct AnomalyClassifier {
    logger: StructuredLogger,
    metrics: MonitorMetrics,
}

impl AnomalyClassifier {
    pub fn new(logger: StructuredLogger) -> Self {
        Self {
            logger,
            metrics: MonitorMetrics::new(),
        }
    }

    /// Returns `true` only when the model labels the sample anomalous
    pub fn classify(&self, sample: &MetricSample, model: Option<&AnomalyModel>) -> bool {
        let Some(model) = model else {
            self.skip("model not loaded");
            return false;
        };

        if !sample.is_valid() {
            self.skip("sample outside valid ranges");
            return false;
        }

        let start = Instant::now();
        let features = sample.features();
        let verdict = model.predict(&features);
        self.metrics
            .observe_classification_latency(start.elapsed().as_secs_f64());

        if verdict.is_anomalous() {
            self.metrics.inc_anomalies_detected();
            self.logger.log_anomaly(sample, model.anomaly_score(&features));
        }

        verdict.is_anomalous()
    }

    fn skip(&self, reason: &str) {
        self.metrics.inc_classifications_skipped();
        self.logger.log_classification_skipped(reason);
    }
}
