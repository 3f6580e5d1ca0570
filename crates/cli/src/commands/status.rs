//! Agent status and health commands

use anyhow::Result;
use colored::Colorize;
use hostwatch_lib::{config::ThresholdConfig, MetricKind};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_reading, color_status, color_verdict, format_percent, format_timestamp, print_json,
    print_rows, FieldRow, OutputFormat,
};

/// Row for the component health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Last Check")]
    last_check: String,
}

/// Evaluate the agent's host once and print the report
pub async fn show_status(
    client: &ApiClient,
    thresholds: &ThresholdConfig,
    format: OutputFormat,
) -> Result<()> {
    let report = client.metrics().await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("{}", "Host Status".bold());
            println!("{}", "=".repeat(40));

            print_rows(vec![
                FieldRow::new(
                    MetricKind::Cpu.display_name(),
                    color_reading(
                        format_percent(report.cpu_usage),
                        report.cpu_usage,
                        thresholds.cpu_threshold,
                    ),
                ),
                FieldRow::new(
                    MetricKind::Memory.display_name(),
                    color_reading(
                        format_percent(report.memory_usage),
                        report.memory_usage,
                        thresholds.memory_threshold,
                    ),
                ),
                FieldRow::new(
                    MetricKind::Load.display_name(),
                    color_reading(
                        format!("{:.2}", report.load_avg),
                        report.load_avg,
                        thresholds.load_threshold,
                    ),
                ),
                FieldRow::new("Anomaly", color_verdict(report.anomaly_detected)),
            ]);
        }
    }

    Ok(())
}

/// Print overall and per-component agent health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!(
                "{} {}",
                "Agent health:".bold(),
                color_status(health.status.as_str())
            );
            println!();

            let rows: Vec<ComponentRow> = health
                .components
                .into_iter()
                .map(|(name, component)| {
                    ComponentRow {
                        status: color_status(component.status.as_str()),
                        message: component.message.unwrap_or_else(|| "-".to_string()),
                        last_check: format_timestamp(component.last_check_timestamp),
                        name,
                    }
                })
                .collect();

            print_rows(rows);
        }
    }

    Ok(())
}
