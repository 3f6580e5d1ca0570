//! Outlier detection over host metrics
//!
//! - `forest`: isolation forest training and scoring
//! - `baseline`: synthetic training data
//! - `store`: artifact persistence and the resident model
//! - `classifier`: per-sample verdicts

mod baseline;
mod classifier;
mod forest;
mod store;

pub use baseline::SyntheticBaseline;
pub use classifier::AnomalyClassifier;
pub use forest::{average_path_length, ForestError, ForestParams, IsolationForest, Verdict};
pub use store::{read_artifact, AnomalyModel, ModelMetadata, ModelStore};
