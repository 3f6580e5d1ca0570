//! Per-request monitoring pipeline
//!
//! One evaluation runs sampler, classifier, threshold evaluator and alert
//! dispatcher in that order. Only a sampling failure aborts the evaluation;
//! model and delivery problems are logged, reflected in component health and
//! otherwise absorbed.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use crate::alerting::{AlertDispatcher, ThresholdEvaluator};
use crate::config::{ModelConfig, MonitorConfig, ThresholdConfig};
use crate::detector::{AnomalyClassifier, AnomalyModel, ModelStore};
use crate::error::{MonitorError, MonitorResult};
use crate::health::{Component, HealthRegistry};
use crate::models::{AlertEvent, MetricsReport};
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::sampler::MetricsSampler;

/// How alert delivery relates to the evaluation that produced the alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertDelivery {
    /// Await every dispatch before returning
    #[default]
    Inline,
    /// Spawn dispatches on the runtime and return immediately
    Background,
}

/// Outcome of one successful evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub report: MetricsReport,
    pub alerts: Vec<AlertEvent>,
}

pub struct MonitorPipeline {
    sampler: Arc<dyn MetricsSampler>,
    store: Arc<ModelStore>,
    classifier: AnomalyClassifier,
    evaluator: ThresholdEvaluator,
    dispatcher: AlertDispatcher,
    delivery: AlertDelivery,
    health: HealthRegistry,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
}

impl MonitorPipeline {
    pub fn builder() -> MonitorPipelineBuilder {
        MonitorPipelineBuilder::new()
    }

    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    pub fn health_registry(&self) -> &HealthRegistry {
        &self.health
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        self.evaluator.config()
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    pub fn sampler_name(&self) -> &str {
        self.sampler.name()
    }

    /// Load the model and mark the monitor ready.
    ///
    /// Returns whether a model is resident. The monitor is ready either way
    /// since classification degrades to "not anomalous" without a model.
    pub async fn start(&self) -> bool {
        let loaded = self.resident_model().await.is_some();
        self.health.mark_started().await;
        loaded
    }

    /// Sample the host, classify, check thresholds and dispatch alerts
    pub async fn evaluate(&self) -> MonitorResult<Evaluation> {
        let start = Instant::now();
        let sample = match self.sampler.sample().await {
            Ok(sample) => {
                self.health.record_success(Component::Sampler).await;
                sample
            }
            Err(err) => {
                self.metrics.inc_sampling_errors();
                self.health
                    .record_failure(Component::Sampler, err.to_string())
                    .await;
                return Err(err);
            }
        };
        self.metrics
            .observe_sampling_latency(start.elapsed().as_secs_f64());

        let model = self.resident_model().await;
        let anomaly_detected = self.classifier.classify(&sample, model.as_deref());

        let alerts = self.evaluator.evaluate(&sample);
        self.deliver(&alerts).await;

        Ok(Evaluation {
            report: MetricsReport::new(&sample, anomaly_detected),
            alerts,
        })
    }

    /// Resident model, loading or training it off the async workers
    async fn resident_model(&self) -> Option<Arc<AnomalyModel>> {
        let store = Arc::clone(&self.store);
        let result = match tokio::task::spawn_blocking(move || store.model()).await {
            Ok(result) => result,
            Err(e) => Err(MonitorError::ModelUnavailable(format!(
                "model task failed: {}",
                e
            ))),
        };

        match result {
            Ok(model) => {
                self.health.record_success(Component::ModelStore).await;
                Some(model)
            }
            Err(err) => {
                self.health
                    .record_failure(Component::ModelStore, err.to_string())
                    .await;
                None
            }
        }
    }

    async fn deliver(&self, alerts: &[AlertEvent]) {
        if alerts.is_empty() {
            return;
        }

        match self.delivery {
            AlertDelivery::Inline => {
                dispatch_all(&self.dispatcher, &self.health, alerts).await;
            }
            AlertDelivery::Background => {
                let dispatcher = self.dispatcher.clone();
                let health = self.health.clone();
                let alerts = alerts.to_vec();
                tokio::spawn(async move {
                    dispatch_all(&dispatcher, &health, &alerts).await;
                });
            }
        }
    }
}

async fn dispatch_all(dispatcher: &AlertDispatcher, health: &HealthRegistry, alerts: &[AlertEvent]) {
    for alert in alerts {
        match dispatcher.dispatch(alert).await {
            Ok(()) => health.record_success(Component::AlertDispatcher).await,
            Err(err) => {
                health
                    .record_failure(Component::AlertDispatcher, err.to_string())
                    .await
            }
        }
    }
}

/// Builder for [`MonitorPipeline`]
pub struct MonitorPipelineBuilder {
    sampler: Option<Arc<dyn MetricsSampler>>,
    store: Option<Arc<ModelStore>>,
    model: ModelConfig,
    thresholds: ThresholdConfig,
    dispatcher: Option<AlertDispatcher>,
    delivery: AlertDelivery,
    health: Option<HealthRegistry>,
    logger: StructuredLogger,
}

impl MonitorPipelineBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            sampler: None,
            store: None,
            model: ModelConfig::default(),
            thresholds: ThresholdConfig::default(),
            dispatcher: None,
            delivery: AlertDelivery::default(),
            health: None,
            logger: StructuredLogger::default(),
        }
    }

    /// Take thresholds and model settings from a resolved configuration
    pub fn config(mut self, config: &MonitorConfig) -> Self {
        self.thresholds = config.thresholds;
        self.model = config.model.clone();
        self
    }

    /// Set the metrics sampler
    pub fn sampler(mut self, sampler: Arc<dyn MetricsSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Set the model settings used when no store is supplied
    pub fn model_config(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    /// Share an existing model store
    pub fn store(mut self, store: Arc<ModelStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the alert thresholds
    pub fn thresholds(mut self, thresholds: ThresholdConfig) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Set the alert dispatcher (defaults to a disabled one)
    pub fn dispatcher(mut self, dispatcher: AlertDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Set the alert delivery mode
    pub fn delivery(mut self, delivery: AlertDelivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Share an existing health registry
    pub fn health_registry(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Set the structured logger handed to every component
    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<MonitorPipeline> {
        let sampler = self
            .sampler
            .ok_or_else(|| anyhow::anyhow!("Sampler is required"))?;

        let logger = self.logger;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(ModelStore::new(self.model, logger.clone())));
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| AlertDispatcher::disabled(logger.clone()));

        Ok(MonitorPipeline {
            sampler,
            store,
            classifier: AnomalyClassifier::new(logger.clone()),
            evaluator: ThresholdEvaluator::new(self.thresholds, logger.clone()),
            dispatcher,
            delivery: self.delivery,
            health: self.health.unwrap_or_default(),
            metrics: MonitorMetrics::new(),
            logger,
        })
    }
}

impl Default for MonitorPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
