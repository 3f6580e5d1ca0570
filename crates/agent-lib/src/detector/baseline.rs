//! Synthetic "normal behavior" training data
//!
//! Stands in for real historical samples until those are collected.

use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError};

use crate::models::{FeatureVector, NUM_FEATURES};

/// Independent per-feature Gaussian approximating a quiet host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticBaseline {
    /// Mean of `[cpu_usage, memory_usage, load_avg]`
    pub mean: FeatureVector,
    /// Standard deviation per feature
    pub scale: FeatureVector,
}

impl Default for SyntheticBaseline {
    fn default() -> Self {
        Self {
            mean: [20.0, 50.0, 0.5],
            scale: [5.0, 10.0, 0.2],
        }
    }
}

impl SyntheticBaseline {
    /// Draw `n` points from the baseline distribution
    pub fn generate<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<FeatureVector>, NormalError> {
        let mut distributions = Vec::with_capacity(NUM_FEATURES);
        for feature in 0..NUM_FEATURES {
            distributions.push(Normal::new(self.mean[feature], self.scale[feature])?);
        }

        Ok((0..n)
            .map(|_| {
                let mut point = [0.0; NUM_FEATURES];
                for (value, dist) in point.iter_mut().zip(&distributions) {
                    *value = dist.sample(rng);
                }
                point
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_generated_means_track_baseline() {
        let baseline = SyntheticBaseline::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let data = baseline.generate(1000, &mut rng).unwrap();

        assert_eq!(data.len(), 1000);
        for feature in 0..NUM_FEATURES {
            let mean = data.iter().map(|p| p[feature]).sum::<f64>() / data.len() as f64;
            let tolerance = baseline.scale[feature] * 0.2;
            assert!(
                (mean - baseline.mean[feature]).abs() < tolerance,
                "feature {} mean {}",
                feature,
                mean
            );
        }
    }

    #[test]
    fn test_invalid_scale_rejected() {
        let baseline = SyntheticBaseline {
            scale: [5.0, f64::NAN, 0.2],
            ..SyntheticBaseline::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(baseline.generate(10, &mut rng).is_err());
    }
}
