//! Random metric source for demos and local development

use std::sync::Mutex;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{async_trait, MetricsSampler};
use crate::error::{MonitorError, MonitorResult};
use crate::models::MetricSample;

/// Produces uniformly random readings rounded to two decimals
pub struct SimulatedSampler {
    rng: Mutex<ChaCha8Rng>,
}

impl Default for SimulatedSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSampler {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::from_entropy()),
        }
    }

    /// Deterministic sequence, for tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[async_trait]
impl MetricsSampler for SimulatedSampler {
    async fn sample(&self) -> MonitorResult<MetricSample> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|e| MonitorError::Acquisition(format!("Lock poisoned: {}", e)))?;

        Ok(MetricSample::new(
            round2(rng.gen_range(0.0..=100.0)),
            round2(rng.gen_range(0.0..=100.0)),
            round2(rng.gen_range(0.0..=10.0)),
        ))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
