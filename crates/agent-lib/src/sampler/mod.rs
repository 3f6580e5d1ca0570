//! Host metrics sampling
//!
//! This module isolates platform differences behind [`MetricsSampler`].
//! The production sampler reads the OS through sysinfo; a simulated sampler
//! produces random readings for demos and local development.

mod simulated;
mod system;

pub use simulated::SimulatedSampler;
pub use system::{load_average_supported, SystemSampler};

use crate::error::MonitorResult;
use crate::models::MetricSample;
use crate::observability::StructuredLogger;
use std::sync::Arc;
use std::time::Duration;

pub use async_trait::async_trait;

/// Trait for metric sampling implementations
#[async_trait]
pub trait MetricsSampler: Send + Sync {
    /// Take one sample of CPU, memory and load
    async fn sample(&self) -> MonitorResult<MetricSample>;

    /// Name used in logs and health reports
    fn name(&self) -> &str;
}

/// Create the sampler selected by configuration
pub fn create_sampler(
    simulate: bool,
    window: Duration,
    logger: StructuredLogger,
) -> Arc<dyn MetricsSampler> {
    if simulate {
        tracing::warn!("Using simulated metrics sampler, readings are random");
        Arc::new(SimulatedSampler::new())
    } else {
        tracing::info!(
            window_ms = window.as_millis() as u64,
            load_average = load_average_supported(),
            "Using system metrics sampler"
        );
        Arc::new(SystemSampler::new(window, logger))
    }
}
