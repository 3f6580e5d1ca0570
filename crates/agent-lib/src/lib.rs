//! Host monitoring library
//!
//! This crate provides the core functionality for:
//! - Sampling CPU, memory and load average from the host
//! - Isolation-forest anomaly detection with a persisted model
//! - Static threshold alerts delivered over SMTP
//! - Health checks and observability

pub mod alerting;
pub mod config;
pub mod detector;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod sampler;

pub use config::MonitorConfig;
pub use error::{MonitorError, MonitorResult};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse,
    ReadinessResponse,
};
pub use models::*;
pub use observability::{MonitorMetrics, StructuredLogger};
pub use pipeline::{AlertDelivery, Evaluation, MonitorPipeline, MonitorPipelineBuilder};
