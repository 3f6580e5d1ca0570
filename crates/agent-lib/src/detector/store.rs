//! Anomaly model persistence
//!
//! The model lives in a single artifact file. Each training run writes to
//! its own temporary file in the target directory and renames it over the
//! target, so readers only ever see a complete artifact and retraining
//! replaces rather than appends.
//!
//! The in-memory copy is cached after the first successful load. Requests
//! racing on a cold cache may all train; the last rename wins and the
//! models are equivalent, so no lock is held across training.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::baseline::SyntheticBaseline;
use super::forest::{ForestParams, IsolationForest, Verdict};
use crate::config::{ModelConfig, MIN_TRAINING_SAMPLES};
use crate::error::{MonitorError, MonitorResult};
use crate::models::FeatureVector;
use crate::observability::{MonitorMetrics, StructuredLogger};

/// Bumped whenever the artifact layout changes
const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Descriptive information stored alongside the forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Unix timestamp of training
    pub trained_at: i64,
    pub training_samples: usize,
    pub n_trees: usize,
    pub contamination: String,
    /// SHA-256 of the serialized forest, hex encoded
    pub checksum: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelArtifact {
    format_version: u32,
    metadata: ModelMetadata,
    forest: Vec<u8>,
}

/// A trained outlier model over `[cpu_usage, memory_usage, load_avg]`
#[derive(Debug, Clone)]
pub struct AnomalyModel {
    forest: IsolationForest,
    metadata: ModelMetadata,
}

impl AnomalyModel {
    pub fn predict(&self, features: &FeatureVector) -> Verdict {
        self.forest.predict(features)
    }

    pub fn anomaly_score(&self, features: &FeatureVector) -> f64 {
        self.forest.anomaly_score(features)
    }

    pub fn decision_function(&self, features: &FeatureVector) -> f64 {
        self.forest.decision_function(features)
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

/// Compute SHA256 checksum of data
fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn lock_poisoned<E: std::fmt::Display>(e: E) -> MonitorError {
    MonitorError::ModelUnavailable(format!("Lock poisoned: {}", e))
}

/// Trains, persists and loads the anomaly model
pub struct ModelStore {
    config: ModelConfig,
    logger: StructuredLogger,
    metrics: MonitorMetrics,
    resident: RwLock<Option<Arc<AnomalyModel>>>,
    training_runs: AtomicU64,
}

impl ModelStore {
    pub fn new(config: ModelConfig, logger: StructuredLogger) -> Self {
        Self {
            config,
            logger,
            metrics: MonitorMetrics::new(),
            resident: RwLock::new(None),
            training_runs: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Number of training runs performed by this store
    pub fn training_runs(&self) -> u64 {
        self.training_runs.load(Ordering::Relaxed)
    }

    /// Whether a model is cached in memory
    pub fn is_resident(&self) -> bool {
        self.resident
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Train on synthetic data and overwrite the artifact
    pub fn train(&self) -> MonitorResult<AnomalyModel> {
        let path = self.config.path.as_path();
        let samples = self.config.training_samples.max(MIN_TRAINING_SAMPLES);
        let start = Instant::now();

        self.logger
            .log_training_started(path, samples, self.config.n_trees);
        self.training_runs.fetch_add(1, Ordering::Relaxed);
        self.metrics.inc_model_trainings();

        match self.fit_and_persist(samples) {
            Ok(model) => {
                self.logger.log_training_finished(
                    path,
                    &model.metadata.checksum,
                    start.elapsed().as_millis(),
                );
                Ok(model)
            }
            Err(err) => {
                self.logger.log_training_failed(path, &err.to_string());
                Err(err)
            }
        }
    }

    fn fit_and_persist(&self, samples: usize) -> MonitorResult<AnomalyModel> {
        let mut rng = match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let data = SyntheticBaseline::default()
            .generate(samples, &mut rng)
            .map_err(|e| MonitorError::ModelUnavailable(format!("invalid baseline: {}", e)))?;

        let params = ForestParams {
            n_trees: self.config.n_trees,
            max_samples: self.config.max_samples,
            contamination: self.config.contamination,
        };
        let forest = IsolationForest::fit(&data, &params, &mut rng)
            .map_err(|e| MonitorError::ModelUnavailable(format!("training failed: {}", e)))?;

        let forest_bytes = bincode::serialize(&forest).map_err(|e| {
            MonitorError::ModelUnavailable(format!("failed to serialize forest: {}", e))
        })?;

        let metadata = ModelMetadata {
            trained_at: chrono::Utc::now().timestamp(),
            training_samples: data.len(),
            n_trees: forest.n_trees(),
            contamination: params.contamination.to_string(),
            checksum: compute_checksum(&forest_bytes),
        };

        let artifact = ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            metadata: metadata.clone(),
            forest: forest_bytes,
        };
        let bytes = bincode::serialize(&artifact).map_err(|e| {
            MonitorError::ModelUnavailable(format!("failed to serialize artifact: {}", e))
        })?;

        save_artifact(&self.config.path, &bytes)?;

        Ok(AnomalyModel { forest, metadata })
    }

    /// Read the artifact from disk, training first if it does not exist
    pub fn load(&self) -> MonitorResult<AnomalyModel> {
        let path = self.config.path.as_path();

        if !path.exists() {
            self.logger.log_model_missing(path);
            self.train()?;

            if !path.exists() {
                let err = MonitorError::ModelUnavailable(format!(
                    "model file {} not found after training",
                    path.display()
                ));
                self.logger.log_model_load_failed(path, &err.to_string());
                return Err(err);
            }
        }

        match read_artifact(path) {
            Ok(model) => {
                self.logger.log_model_loaded(path, &model.metadata.checksum);
                Ok(model)
            }
            Err(err) => {
                self.logger.log_model_load_failed(path, &err.to_string());
                Err(err)
            }
        }
    }

    /// Resident model, loading (and possibly training) it on first use
    pub fn model(&self) -> MonitorResult<Arc<AnomalyModel>> {
        {
            let resident = self.resident.read().map_err(lock_poisoned)?;
            if let Some(model) = resident.as_ref() {
                return Ok(Arc::clone(model));
            }
        }

        let model = Arc::new(self.load()?);
        *self.resident.write().map_err(lock_poisoned)? = Some(Arc::clone(&model));
        self.metrics.set_model_loaded(true);

        Ok(model)
    }
}

/// Write bytes to a private temp file and rename it over `path`
fn save_artifact(path: &Path, bytes: &[u8]) -> MonitorResult<()> {
    let persist_error = |e: std::io::Error| {
        MonitorError::ModelUnavailable(format!(
            "failed to persist model to {}: {}",
            path.display(),
            e
        ))
    };

    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(persist_error)?;
            parent
        }
        None => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(persist_error)?;
    file.write_all(bytes).map_err(persist_error)?;
    file.as_file().sync_all().map_err(persist_error)?;

    file.persist(path).map_err(|e| persist_error(e.error))?;
    Ok(())
}

/// Decode and verify an artifact without touching any store state
pub fn read_artifact(path: &Path) -> MonitorResult<AnomalyModel> {
    let bytes = fs::read(path).map_err(|e| {
        MonitorError::ModelUnavailable(format!("failed to read {}: {}", path.display(), e))
    })?;

    let artifact: ModelArtifact = bincode::deserialize(&bytes)
        .map_err(|e| MonitorError::ModelUnavailable(format!("corrupt model artifact: {}", e)))?;

    if artifact.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(MonitorError::ModelUnavailable(format!(
            "unsupported artifact format {}, expected {}",
            artifact.format_version, ARTIFACT_FORMAT_VERSION
        )));
    }

    let computed = compute_checksum(&artifact.forest);
    if computed != artifact.metadata.checksum {
        return Err(MonitorError::ModelUnavailable(format!(
            "Checksum mismatch: expected {}, got {}",
            artifact.metadata.checksum, computed
        )));
    }

    let forest: IsolationForest = bincode::deserialize(&artifact.forest)
        .map_err(|e| MonitorError::ModelUnavailable(format!("corrupt forest: {}", e)))?;

    Ok(AnomalyModel {
        forest,
        metadata: artifact.metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn small_config(path: &Path) -> ModelConfig {
        ModelConfig {
            training_samples: 200,
            n_trees: 20,
            ..ModelConfig::with_path(path)
        }
    }

    #[test]
    fn test_load_trains_once_then_reuses_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("models").join("anomaly_model.bin");
        let store = ModelStore::new(small_config(&path), StructuredLogger::default());

        let first = store.load().unwrap();
        assert!(path.exists());
        assert_eq!(store.training_runs(), 1);

        let second = store.load().unwrap();
        assert_eq!(store.training_runs(), 1);
        assert_eq!(first.metadata(), second.metadata());
    }

    #[test]
    fn test_train_overwrites_single_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let store = ModelStore::new(small_config(&path), StructuredLogger::default());

        store.train().unwrap();
        store.train().unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(store.training_runs(), 2);
    }

    #[test]
    fn test_loaded_model_matches_trained_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let store = ModelStore::new(small_config(&path), StructuredLogger::default());

        let trained = store.train().unwrap();
        let loaded = read_artifact(&path).unwrap();

        let point = [85.0, 91.0, 6.0];
        assert_eq!(trained.anomaly_score(&point), loaded.anomaly_score(&point));
        assert_eq!(loaded.metadata().training_samples, 200);
        assert_eq!(loaded.metadata().n_trees, 20);
        assert_eq!(loaded.metadata().contamination, "auto");
    }

    #[test]
    fn test_persistence_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();

        let path = blocker.join("model.bin");
        let store = ModelStore::new(small_config(&path), StructuredLogger::default());

        let err = store.train().unwrap_err();
        assert!(matches!(err, MonitorError::ModelUnavailable(_)));

        let err = store.load().unwrap_err();
        assert!(matches!(err, MonitorError::ModelUnavailable(_)));
        assert!(store.model().is_err());
        assert!(!store.is_resident());
    }

    #[test]
    fn test_corrupt_artifact_is_not_retrained() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        fs::write(&path, b"definitely not a model").unwrap();

        let store = ModelStore::new(small_config(&path), StructuredLogger::default());
        let err = store.load().unwrap_err();

        assert!(matches!(err, MonitorError::ModelUnavailable(_)));
        assert_eq!(store.training_runs(), 0);
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let store = ModelStore::new(small_config(&path), StructuredLogger::default());
        store.train().unwrap();

        let mut artifact: ModelArtifact = bincode::deserialize(&fs::read(&path).unwrap()).unwrap();
        artifact.metadata.checksum = "00".repeat(32);
        fs::write(&path, bincode::serialize(&artifact).unwrap()).unwrap();

        match read_artifact(&path) {
            Err(MonitorError::ModelUnavailable(msg)) => assert!(msg.contains("Checksum mismatch")),
            other => panic!("expected checksum failure, got {:?}", other.map(|m| m.metadata().clone())),
        }
    }

    #[test]
    fn test_model_is_cached_after_first_use() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let store = ModelStore::new(small_config(&path), StructuredLogger::default());

        let first = store.model().unwrap();
        assert!(store.is_resident());

        // Removing the file does not matter once the model is resident
        fs::remove_file(&path).unwrap();
        let second = store.model().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.training_runs(), 1);
    }

    #[test]
    fn test_concurrent_cold_loads_all_succeed() {
        const LOADERS: usize = 8;

        for _ in 0..5 {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("models").join("anomaly_model.bin");
            let store = Arc::new(ModelStore::new(
                small_config(&path),
                StructuredLogger::default(),
            ));
            let barrier = Arc::new(std::sync::Barrier::new(LOADERS));

            let handles: Vec<_> = (0..LOADERS)
                .map(|_| {
                    let store = Arc::clone(&store);
                    let barrier = Arc::clone(&barrier);
                    std::thread::spawn(move || {
                        barrier.wait();
                        store.load().map(|model| model.metadata().checksum.clone())
                    })
                })
                .collect();

            let checksums: Vec<_> = handles
                .into_iter()
                .map(|h| h.join().unwrap().unwrap())
                .collect();

            // Same seed, same forest, whichever rename landed last
            assert!(checksums.iter().all(|c| c == &checksums[0]));
            assert!(store.training_runs() >= 1);

            let entries: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
            assert_eq!(entries.len(), 1, "temp files must not be left behind");
            read_artifact(&path).unwrap();
        }
    }

    #[test]
    fn test_checksum_is_sha256_hex() {
        let checksum = compute_checksum(b"hostwatch");
        assert_eq!(checksum.len(), 64);
        assert!(checksum.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
