//! Static threshold checks

use crate::config::ThresholdConfig;
use crate::models::{AlertEvent, MetricKind, MetricSample};
use crate::observability::{MonitorMetrics, StructuredLogger};

/// Compares each sample against configured per-metric limits
#[derive(Clone)]
pub struct ThresholdEvaluator {
    config: ThresholdConfig,
    logger: StructuredLogger,
    metrics: MonitorMetrics,
}

impl ThresholdEvaluator {
    pub fn new(config: ThresholdConfig, logger: StructuredLogger) -> Self {
        Self {
            config,
            logger,
            metrics: MonitorMetrics::new(),
        }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// One event per metric strictly above its threshold, in CPU, memory,
    /// load order. Load is ignored when the platform has none.
    pub fn evaluate(&self, sample: &MetricSample) -> Vec<AlertEvent> {
        let mut checks = vec![
            (MetricKind::Cpu, sample.cpu_usage, self.config.cpu_threshold),
            (
                MetricKind::Memory,
                sample.memory_usage,
                self.config.memory_threshold,
            ),
        ];
        if sample.load_available {
            checks.push((MetricKind::Load, sample.load_avg, self.config.load_threshold));
        }

        checks
            .into_iter()
            .filter(|(_, value, threshold)| value > threshold)
            .map(|(metric, value, threshold)| {
                let alert = AlertEvent {
                    metric,
                    value,
                    threshold,
                };
                self.metrics.inc_threshold_breaches();
                self.logger.log_threshold_breached(&alert);
                alert
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> ThresholdEvaluator {
        ThresholdEvaluator::new(ThresholdConfig::default(), StructuredLogger::default())
    }

    #[test]
    fn test_single_cpu_breach() {
        let alerts = evaluator().evaluate(&MetricSample::new(95.0, 40.0, 1.0));

        assert_eq!(
            alerts,
            vec![AlertEvent {
                metric: MetricKind::Cpu,
                value: 95.0,
                threshold: 80.0,
            }]
        );
    }

    #[test]
    fn test_equal_to_threshold_does_not_alert() {
        let alerts = evaluator().evaluate(&MetricSample::new(80.0, 80.0, 5.0));
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_all_breaches_in_order() {
        let alerts = evaluator().evaluate(&MetricSample::new(81.0, 99.5, 7.25));
        let kinds: Vec<_> = alerts.iter().map(|a| a.metric).collect();

        assert_eq!(kinds, vec![MetricKind::Cpu, MetricKind::Memory, MetricKind::Load]);
        assert_eq!(alerts[2].value, 7.25);
        assert_eq!(alerts[2].threshold, 5.0);
    }

    #[test]
    fn test_load_skipped_when_unavailable() {
        let mut sample = MetricSample::without_load(10.0, 10.0);
        sample.load_avg = 50.0;

        assert!(evaluator().evaluate(&sample).is_empty());
    }

    #[test]
    fn test_custom_thresholds() {
        let config = ThresholdConfig {
            cpu_threshold: 10.0,
            memory_threshold: 95.0,
            load_threshold: 0.25,
        };
        let evaluator = ThresholdEvaluator::new(config, StructuredLogger::default());
        let alerts = evaluator.evaluate(&MetricSample::new(10.5, 50.0, 0.3));

        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].metric, MetricKind::Cpu);
        assert_eq!(alerts[1].metric, MetricKind::Load);
    }
}
