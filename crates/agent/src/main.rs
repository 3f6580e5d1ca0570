//! Hostwatch agent - host metrics anomaly monitor
//!
//! Serves the current host metrics with an anomaly verdict on every
//! request and emails an alert whenever a static threshold is exceeded.

use anyhow::Result;
use hostwatch_agent::{api, config::AgentConfig};
use hostwatch_lib::{
    alerting::AlertDispatcher, sampler::create_sampler, AlertDelivery, HealthRegistry,
    MonitorConfig, MonitorPipeline, StructuredLogger,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let agent_config = AgentConfig::load();
    let monitor_config = MonitorConfig::from_env();
    info!(
        node_name = %agent_config.node_name,
        api_port = agent_config.api_port,
        simulate = agent_config.simulate,
        smtp = ?monitor_config.smtp,
        "Agent configured"
    );

    let logger = StructuredLogger::new(&agent_config.node_name);
    logger.log_startup(AGENT_VERSION, &monitor_config.model.path);

    let sampler = create_sampler(
        agent_config.simulate,
        monitor_config.sample_window,
        logger.clone(),
    );

    let dispatcher = AlertDispatcher::from_config(&monitor_config.smtp, logger.clone())
        .unwrap_or_else(|e| {
            warn!(error = %e, "Alert delivery disabled");
            AlertDispatcher::disabled(logger.clone())
        });

    let health_registry = HealthRegistry::new();
    let pipeline = MonitorPipeline::builder()
        .config(&monitor_config)
        .sampler(sampler)
        .dispatcher(dispatcher)
        .delivery(AlertDelivery::Background)
        .health_registry(health_registry)
        .logger(logger.clone())
        .build()?;
    let pipeline = Arc::new(pipeline);

    let model_loaded = pipeline.start().await;
    info!(
        model_loaded,
        sampler = pipeline.sampler_name(),
        "Monitor ready"
    );

    let app_state = Arc::new(api::AppState::new(Arc::clone(&pipeline)));
    let api_handle = tokio::spawn(api::serve(agent_config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    logger.log_shutdown("API server failed");
                    return Err(e);
                }
                Err(e) => {
                    logger.log_shutdown("API server task panicked");
                    return Err(e.into());
                }
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
