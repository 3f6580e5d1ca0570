//! Isolation forest outlier detection
//!
//! Each tree recursively partitions a random sub-sample on random features at
//! random split points. Outliers sit in sparse regions and are isolated after
//! few splits, so a short average path length across the ensemble means an
//! anomalous point.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Contamination;
use crate::models::{FeatureVector, NUM_FEATURES};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Decision offset used with [`Contamination::Auto`]
const AUTO_OFFSET: f64 = -0.5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForestError {
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("forest needs at least one tree")]
    NoTrees,
    #[error("training point {0} contains a non-finite value")]
    NonFiniteInput(usize),
}

/// Model verdict for one point, using the +1/-1 convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Normal,
    Anomalous,
}

impl Verdict {
    /// +1 for normal, -1 for anomalous
    pub fn label(&self) -> i8 {
        match self {
            Verdict::Normal => 1,
            Verdict::Anomalous => -1,
        }
    }

    pub fn is_anomalous(&self) -> bool {
        matches!(self, Verdict::Anomalous)
    }
}

/// Hyper-parameters for [`IsolationForest::fit`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    /// Sub-sample drawn per tree, capped at the training set size
    pub max_samples: usize,
    pub contamination: Contamination,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            contamination: Contamination::Auto,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

/// One random partitioning tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    fn grow<R: Rng + ?Sized>(points: Vec<FeatureVector>, height_limit: usize, rng: &mut R) -> Self {
        Self {
            root: grow_node(points, 0, height_limit, rng),
        }
    }

    /// Depth at which `point` is isolated, corrected for unsplit leaves
    pub fn path_length(&self, point: &FeatureVector) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;

        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if point[*feature] < *threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

fn grow_node<R: Rng + ?Sized>(
    points: Vec<FeatureVector>,
    depth: usize,
    height_limit: usize,
    rng: &mut R,
) -> Node {
    if depth >= height_limit || points.len() <= 1 {
        return Node::Leaf { size: points.len() };
    }

    // Only features with a spread can separate points
    let mut bounds = [(0.0, 0.0); NUM_FEATURES];
    let mut candidates = Vec::with_capacity(NUM_FEATURES);
    for (feature, bound) in bounds.iter_mut().enumerate() {
        let (min, max) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p[feature]), hi.max(p[feature]))
        });
        *bound = (min, max);
        if max > min {
            candidates.push(feature);
        }
    }

    if candidates.is_empty() {
        return Node::Leaf { size: points.len() };
    }

    let feature = candidates[rng.gen_range(0..candidates.len())];
    let (min, max) = bounds[feature];
    let threshold = rng.gen_range(min..max);

    let (left, right): (Vec<_>, Vec<_>) = points.into_iter().partition(|p| p[feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow_node(left, depth + 1, height_limit, rng)),
        right: Box::new(grow_node(right, depth + 1, height_limit, rng)),
    }
}

/// Average path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Ensemble of isolation trees with a calibrated decision offset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    offset: f64,
}

impl IsolationForest {
    /// Fit a forest on points assumed to be mostly normal
    pub fn fit<R: Rng + ?Sized>(
        data: &[FeatureVector],
        params: &ForestParams,
        rng: &mut R,
    ) -> Result<Self, ForestError> {
        if data.is_empty() {
            return Err(ForestError::EmptyTrainingSet);
        }
        if params.n_trees == 0 {
            return Err(ForestError::NoTrees);
        }
        if let Some(bad) = data.iter().position(|p| p.iter().any(|v| !v.is_finite())) {
            return Err(ForestError::NonFiniteInput(bad));
        }

        let sample_size = params.max_samples.clamp(1, data.len());
        let height_limit = (sample_size as f64).log2().ceil() as usize;

        let trees = (0..params.n_trees)
            .map(|_| {
                let points = index::sample(rng, data.len(), sample_size)
                    .iter()
                    .map(|i| data[i])
                    .collect();
                IsolationTree::grow(points, height_limit, rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            offset: AUTO_OFFSET,
        };

        if let Contamination::Fraction(fraction) = params.contamination {
            let mut scores: Vec<f64> = data.iter().map(|p| forest.score_samples(p)).collect();
            forest.offset = percentile(&mut scores, fraction * 100.0);
        }

        Ok(forest)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Normalized anomaly score in (0, 1]; above 0.5 leans anomalous
    pub fn anomaly_score(&self, point: &FeatureVector) -> f64 {
        let mean_path = self
            .trees
            .iter()
            .map(|tree| tree.path_length(point))
            .sum::<f64>()
            / self.trees.len() as f64;
        let normaliser = average_path_length(self.sample_size).max(1.0);

        2f64.powf(-mean_path / normaliser)
    }

    /// Opposite of the anomaly score; lower is more abnormal
    pub fn score_samples(&self, point: &FeatureVector) -> f64 {
        -self.anomaly_score(point)
    }

    /// Signed distance to the decision boundary; negative means anomalous
    pub fn decision_function(&self, point: &FeatureVector) -> f64 {
        self.score_samples(point) - self.offset
    }

    pub fn predict(&self, point: &FeatureVector) -> Verdict {
        if self.decision_function(point) < 0.0 {
            Verdict::Anomalous
        } else {
            Verdict::Normal
        }
    }
}

/// Linear-interpolated percentile (0-100) of `values`, which get sorted
fn percentile(values: &mut [f64], pct: f64) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (pct / 100.0).clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    values[lower] + (values[upper] - values[lower]) * weight
}
