//! Effective configuration view

use anyhow::Result;
use hostwatch_lib::{MetricKind, MonitorConfig};
use serde::Serialize;

use crate::output::{print_json, print_rows, print_warning, FieldRow, OutputFormat};

#[derive(Debug, Serialize)]
struct EffectiveThresholds {
    cpu_threshold: f64,
    memory_threshold: f64,
    load_threshold: f64,
    alerts_enabled: bool,
    smtp_relay: String,
    model_path: String,
}

/// Print the thresholds and alert settings this environment resolves to
pub fn show_thresholds(config: &MonitorConfig, format: OutputFormat) -> Result<()> {
    let effective = EffectiveThresholds {
        cpu_threshold: config.thresholds.cpu_threshold,
        memory_threshold: config.thresholds.memory_threshold,
        load_threshold: config.thresholds.load_threshold,
        alerts_enabled: config.smtp.is_configured(),
        smtp_relay: format!("{}:{}", config.smtp.host, config.smtp.port),
        model_path: config.model.path.display().to_string(),
    };

    match format {
        OutputFormat::Json => print_json(&effective)?,
        OutputFormat::Table => {
            print_rows(vec![
                FieldRow::new(
                    MetricKind::Cpu.display_name(),
                    format!("> {}", effective.cpu_threshold),
                ),
                FieldRow::new(
                    MetricKind::Memory.display_name(),
                    format!("> {}", effective.memory_threshold),
                ),
                FieldRow::new(
                    MetricKind::Load.display_name(),
                    format!("> {}", effective.load_threshold),
                ),
                FieldRow::new("SMTP Relay", effective.smtp_relay.clone()),
                FieldRow::new("Model Path", effective.model_path.clone()),
            ]);

            if !effective.alerts_enabled {
                print_warning("Email credentials not configured, alerts will be skipped");
            }
        }
    }

    Ok(())
}
