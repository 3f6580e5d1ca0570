//! Local anomaly model commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hostwatch_lib::config::{ModelConfig, MonitorConfig};
use hostwatch_lib::detector::{read_artifact, ModelMetadata, ModelStore};
use hostwatch_lib::StructuredLogger;

use crate::output::{format_timestamp, print_json, print_rows, print_success, FieldRow, OutputFormat};

/// Model settings from the environment, with an optional path override
pub fn model_config(config: &MonitorConfig, path: Option<PathBuf>) -> ModelConfig {
    match path {
        Some(path) => ModelConfig {
            path,
            ..config.model.clone()
        },
        None => config.model.clone(),
    }
}

pub(crate) fn metadata_rows(metadata: &ModelMetadata) -> Vec<FieldRow> {
    vec![
        FieldRow::new("Trained At", format_timestamp(metadata.trained_at)),
        FieldRow::new("Training Samples", metadata.training_samples.to_string()),
        FieldRow::new("Trees", metadata.n_trees.to_string()),
        FieldRow::new("Contamination", metadata.contamination.clone()),
        FieldRow::new("Checksum", metadata.checksum.clone()),
    ]
}

/// Train on synthetic data, overwriting any existing artifact
pub fn train(config: ModelConfig, format: OutputFormat) -> Result<()> {
    let store = ModelStore::new(config, StructuredLogger::new("hwctl"));
    let model = store.train().context("Model training failed")?;

    match format {
        OutputFormat::Json => print_json(model.metadata())?,
        OutputFormat::Table => {
            print_success(&format!("Model saved to {}", store.path().display()));
            print_rows(metadata_rows(model.metadata()));
        }
    }

    Ok(())
}

/// Print metadata of an existing artifact
pub fn inspect(path: &Path, format: OutputFormat) -> Result<()> {
    let model = read_artifact(path)
        .with_context(|| format!("Failed to read model artifact {}", path.display()))?;

    match format {
        OutputFormat::Json => print_json(model.metadata())?,
        OutputFormat::Table => {
            println!("Model: {}", path.display());
            print_rows(metadata_rows(model.metadata()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_path_override_keeps_other_settings() {
        let config = MonitorConfig::from_vars([("MODEL_TREES", "25")]);
        let model = model_config(&config, Some(PathBuf::from("/tmp/other.bin")));

        assert_eq!(model.path, PathBuf::from("/tmp/other.bin"));
        assert_eq!(model.n_trees, 25);
    }

    #[test]
    fn test_train_then_inspect() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let config = ModelConfig {
            training_samples: 200,
            n_trees: 10,
            ..ModelConfig::with_path(&path)
        };

        train(config, OutputFormat::Json).unwrap();
        inspect(&path, OutputFormat::Table).unwrap();
    }

    #[test]
    fn test_inspect_missing_artifact_fails() {
        let dir = TempDir::new().unwrap();
        let err = inspect(&dir.path().join("absent.bin"), OutputFormat::Json).unwrap_err();
        assert!(err.to_string().contains("Failed to read model artifact"));
    }
}
