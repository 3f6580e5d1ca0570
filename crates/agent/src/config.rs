//! Agent configuration

use std::collections::HashMap;

use serde::Deserialize;

/// Agent configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentConfig {
    /// Name attached to every structured log line
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// HTTP port for metrics, health and prometheus endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Serve random readings instead of sampling the host
    #[serde(default)]
    pub simulate: bool,
}

fn default_node_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

fn default_api_port() -> u16 {
    5000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            api_port: default_api_port(),
            simulate: false,
        }
    }
}

impl AgentConfig {
    /// Load configuration from `HOSTWATCH_*` environment variables
    pub fn load() -> Self {
        Self::from_environment(config::Environment::with_prefix("HOSTWATCH"))
    }

    /// Load configuration from an explicit variable map
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_environment(config::Environment::with_prefix("HOSTWATCH").source(Some(map)))
    }

    fn from_environment(environment: config::Environment) -> Self {
        let config = config::Config::builder()
            .add_source(environment.try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize::<AgentConfig>());

        config.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Invalid agent configuration, using defaults");
            AgentConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = AgentConfig::from_vars(Vec::<(String, String)>::new());
        assert_eq!(config.api_port, 5000);
        assert!(!config.simulate);
        assert!(!config.node_name.is_empty());
    }

    #[test]
    fn test_prefixed_overrides() {
        let config = AgentConfig::from_vars([
            ("HOSTWATCH_API_PORT", "8088"),
            ("HOSTWATCH_NODE_NAME", "edge-01"),
            ("HOSTWATCH_SIMULATE", "true"),
        ]);

        assert_eq!(config.api_port, 8088);
        assert_eq!(config.node_name, "edge-01");
        assert!(config.simulate);
    }

    #[test]
    fn test_invalid_port_falls_back() {
        let config = AgentConfig::from_vars([("HOSTWATCH_API_PORT", "not-a-port")]);
        assert_eq!(config.api_port, 5000);
    }
}
