//! Offline classification of a hand-entered sample

use anyhow::{bail, Context, Result};
use hostwatch_lib::config::ModelConfig;
use hostwatch_lib::detector::{AnomalyClassifier, ModelStore};
use hostwatch_lib::{MetricKind, MetricSample, StructuredLogger};
use serde::Serialize;

use crate::output::{color_verdict, format_percent, print_info, print_json, print_rows, FieldRow, OutputFormat};

#[derive(Debug, Serialize)]
struct Classification {
    cpu_usage: f64,
    memory_usage: f64,
    load_avg: f64,
    anomaly_detected: bool,
    anomaly_score: f64,
    decision: f64,
}

/// Classify one sample against the local model, training it if absent
pub fn classify(
    config: ModelConfig,
    cpu: f64,
    memory: f64,
    load: f64,
    format: OutputFormat,
) -> Result<()> {
    let sample = MetricSample::new(cpu, memory, load);
    if !sample.is_valid() {
        bail!("CPU and memory must be within 0-100 and load must be non-negative");
    }

    let logger = StructuredLogger::new("hwctl");
    let store = ModelStore::new(config, logger.clone());
    let existed = store.path().exists();
    let model = store.load().context("Failed to load anomaly model")?;

    let anomaly_detected = AnomalyClassifier::new(logger).classify(&sample, Some(&model));
    let features = sample.features();
    let result = Classification {
        cpu_usage: sample.cpu_usage,
        memory_usage: sample.memory_usage,
        load_avg: sample.load_avg,
        anomaly_detected,
        anomaly_score: model.anomaly_score(&features),
        decision: model.decision_function(&features),
    };

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            if !existed {
                print_info(&format!(
                    "No model found, trained a new one at {}",
                    store.path().display()
                ));
            }
            print_rows(vec![
                FieldRow::new(MetricKind::Cpu.display_name(), format_percent(result.cpu_usage)),
                FieldRow::new(
                    MetricKind::Memory.display_name(),
                    format_percent(result.memory_usage),
                ),
                FieldRow::new(MetricKind::Load.display_name(), format!("{:.2}", result.load_avg)),
                FieldRow::new("Anomaly Score", format!("{:.4}", result.anomaly_score)),
                FieldRow::new("Decision", format!("{:+.4}", result.decision)),
                FieldRow::new("Verdict", color_verdict(result.anomaly_detected)),
            ]);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_out_of_range_sample_rejected() {
        let dir = TempDir::new().unwrap();
        let config = ModelConfig::with_path(dir.path().join("model.bin"));

        let err = classify(config, 150.0, 20.0, 0.5, OutputFormat::Json).unwrap_err();
        assert!(err.to_string().contains("0-100"));
        assert!(!dir.path().join("model.bin").exists());
    }

    #[test]
    fn test_classify_trains_missing_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let config = ModelConfig {
            training_samples: 200,
            n_trees: 10,
            ..ModelConfig::with_path(&path)
        };

        classify(config, 20.0, 50.0, 0.5, OutputFormat::Table).unwrap();
        assert!(path.exists());
    }
}
