//! Component health for the host monitor
//!
//! The monitor has exactly three moving parts. A failing sampler makes the
//! monitor unhealthy because no report can be produced; model and alerting
//! failures only degrade it since `/metrics` still answers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    /// Serialized name
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Healthy => "healthy",
            ComponentStatus::Degraded => "degraded",
            ComponentStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Monitored parts of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Sampler,
    ModelStore,
    AlertDispatcher,
}

impl Component {
    pub const ALL: [Component; 3] = [
        Component::Sampler,
        Component::ModelStore,
        Component::AlertDispatcher,
    ];

    /// Key used in health reports
    pub fn name(&self) -> &'static str {
        match self {
            Component::Sampler => "sampler",
            Component::ModelStore => "model_store",
            Component::AlertDispatcher => "alert_dispatcher",
        }
    }

    /// Status a failure of this component puts it in
    pub fn failure_status(&self) -> ComponentStatus {
        match self {
            Component::Sampler => ComponentStatus::Unhealthy,
            Component::ModelStore | Component::AlertDispatcher => ComponentStatus::Degraded,
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Last observed outcome of one component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn observed(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug)]
struct HealthState {
    components: [ComponentHealth; 3],
    started: bool,
}

/// Shared view of component outcomes and startup state
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    /// All components start healthy; the monitor is not ready until started
    pub fn new() -> Self {
        let healthy = || ComponentHealth::observed(ComponentStatus::Healthy, None);
        Self {
            state: Arc::new(RwLock::new(HealthState {
                components: [healthy(), healthy(), healthy()],
                started: false,
            })),
        }
    }

    pub async fn record_success(&self, component: Component) {
        let mut state = self.state.write().await;
        state.components[component.index()] =
            ComponentHealth::observed(ComponentStatus::Healthy, None);
    }

    pub async fn record_failure(&self, component: Component, message: impl Into<String>) {
        let mut state = self.state.write().await;
        state.components[component.index()] =
            ComponentHealth::observed(component.failure_status(), Some(message.into()));
    }

    pub async fn mark_started(&self) {
        self.state.write().await.started = true;
    }

    pub async fn status_of(&self, component: Component) -> ComponentStatus {
        self.state.read().await.components[component.index()].status
    }

    /// Worst component status plus every component's last outcome
    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        let status = state
            .components
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        let components = Component::ALL
            .iter()
            .map(|c| (c.name().to_string(), state.components[c.index()].clone()))
            .collect();

        HealthResponse { status, components }
    }

    /// Ready once started, as long as the host can still be sampled
    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        let reason = if !state.started {
            Some("Monitor not yet initialized")
        } else if state.components[Component::Sampler.index()].status
            == ComponentStatus::Unhealthy
        {
            Some("Host metrics cannot be sampled")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_registry_reports_every_component() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        let names: Vec<_> = health.components.keys().cloned().collect();
        assert_eq!(names, vec!["alert_dispatcher", "model_store", "sampler"]);
    }

    #[tokio::test]
    async fn test_model_store_failure_degrades() {
        let registry = HealthRegistry::new();
        registry
            .record_failure(Component::ModelStore, "permission denied")
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components["model_store"].message.as_deref(),
            Some("permission denied")
        );
    }

    #[tokio::test]
    async fn test_sampler_failure_outranks_degraded() {
        let registry = HealthRegistry::new();
        registry
            .record_failure(Component::AlertDispatcher, "timeout")
            .await;
        registry
            .record_failure(Component::Sampler, "no memory information")
            .await;

        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
        assert_eq!(
            registry.status_of(Component::AlertDispatcher).await,
            ComponentStatus::Degraded
        );
    }

    #[tokio::test]
    async fn test_component_recovers() {
        let registry = HealthRegistry::new();
        registry.record_failure(Component::Sampler, "failed").await;
        registry.record_success(Component::Sampler).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components["sampler"].message.is_none());
    }

    #[tokio::test]
    async fn test_not_ready_until_started() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());

        registry.mark_started().await;
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_ready_when_degraded() {
        let registry = HealthRegistry::new();
        registry.mark_started().await;
        registry
            .record_failure(Component::AlertDispatcher, "smtp timeout")
            .await;

        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_not_ready_when_sampler_fails() {
        let registry = HealthRegistry::new();
        registry.mark_started().await;
        registry.record_failure(Component::Sampler, "Failed").await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("Host metrics cannot be sampled")
        );
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ComponentStatus::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
        assert_eq!(ComponentStatus::Unhealthy.as_str(), "unhealthy");
    }
}
