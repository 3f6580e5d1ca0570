//! Monitor configuration
//!
//! Everything is resolved once from the process environment at startup and
//! handed to each component by value. Missing keys fall back to documented
//! defaults silently; keys that are present but unusable fall back with a
//! warning. Loading never fails.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::MonitorError;

pub const DEFAULT_CPU_THRESHOLD: f64 = 80.0;
pub const DEFAULT_MEMORY_THRESHOLD: f64 = 80.0;
pub const DEFAULT_LOAD_THRESHOLD: f64 = 5.0;

pub const DEFAULT_MODEL_PATH: &str = "models/anomaly_model.bin";
pub const DEFAULT_TRAINING_SAMPLES: usize = 1000;
pub const MIN_TRAINING_SAMPLES: usize = 100;
pub const DEFAULT_TREES: usize = 100;
pub const DEFAULT_MAX_SAMPLES: usize = 256;
pub const DEFAULT_SEED: u64 = 42;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
/// Upper bound on the SMTP connection timeout
pub const MAX_SMTP_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_SAMPLE_WINDOW: Duration = Duration::from_millis(200);
/// CPU readings over shorter windows are dominated by zeros
pub const MIN_SAMPLE_WINDOW: Duration = Duration::from_millis(100);

/// Static alert thresholds, fixed for the process lifetime
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub load_threshold: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu_threshold: DEFAULT_CPU_THRESHOLD,
            memory_threshold: DEFAULT_MEMORY_THRESHOLD,
            load_threshold: DEFAULT_LOAD_THRESHOLD,
        }
    }
}

/// Expected share of outliers in the training data
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Contamination {
    /// Fixed decision offset of -0.5 on the anomaly score
    #[default]
    Auto,
    /// Offset calibrated so this fraction of training points is flagged
    Fraction(f64),
}

impl FromStr for Contamination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(Contamination::Auto);
        }

        let fraction: f64 = trimmed
            .parse()
            .map_err(|_| format!("expected \"auto\" or a fraction, got {:?}", s))?;
        if fraction > 0.0 && fraction <= 0.5 {
            Ok(Contamination::Fraction(fraction))
        } else {
            Err(format!("fraction {} outside (0, 0.5]", fraction))
        }
    }
}

impl fmt::Display for Contamination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contamination::Auto => write!(f, "auto"),
            Contamination::Fraction(v) => write!(f, "{}", v),
        }
    }
}

/// Anomaly model training and persistence settings
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub training_samples: usize,
    pub n_trees: usize,
    pub max_samples: usize,
    pub contamination: Contamination,
    /// Seed for reproducible training; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
            training_samples: DEFAULT_TRAINING_SAMPLES,
            n_trees: DEFAULT_TREES,
            max_samples: DEFAULT_MAX_SAMPLES,
            contamination: Contamination::Auto,
            seed: Some(DEFAULT_SEED),
        }
    }
}

impl ModelConfig {
    /// Default settings with the artifact stored at `path`
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// SMTP delivery settings
#[derive(Clone, PartialEq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub receiver: Option<String>,
    pub timeout: Duration,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SMTP_HOST.to_string(),
            port: DEFAULT_SMTP_PORT,
            username: None,
            password: None,
            receiver: None,
            timeout: MAX_SMTP_TIMEOUT,
        }
    }
}

impl SmtpConfig {
    /// Sender, secret and receiver, if all three are set and non-empty
    pub fn credentials(&self) -> Option<(&str, &str, &str)> {
        fn non_empty(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.trim().is_empty())
        }

        Some((
            non_empty(&self.username)?,
            non_empty(&self.password)?,
            non_empty(&self.receiver)?,
        ))
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("receiver", &self.receiver)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitorConfig {
    pub thresholds: ThresholdConfig,
    pub model: ModelConfig,
    pub smtp: SmtpConfig,
    /// CPU observation window per sample
    pub sample_window: Duration,
}

impl MonitorConfig {
    /// Resolve configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_environment(Environment::default())
    }

    /// Resolve configuration from an explicit variable map
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
        Self::from_environment(Environment::default().source(Some(map)))
    }

    fn from_environment(environment: Environment) -> Self {
        let source = Config::builder()
            .add_source(environment)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read environment, using default configuration");
                Config::default()
            });

        let non_negative = |v: &f64| {
            if v.is_finite() && *v >= 0.0 {
                Ok(())
            } else {
                Err(format!("{} is not a finite, non-negative number", v))
            }
        };

        let thresholds = ThresholdConfig {
            cpu_threshold: resolve(&source, "CPU_ALERT_THRESHOLD", DEFAULT_CPU_THRESHOLD, non_negative),
            memory_threshold: resolve(
                &source,
                "MEMORY_ALERT_THRESHOLD",
                DEFAULT_MEMORY_THRESHOLD,
                non_negative,
            ),
            load_threshold: resolve(&source, "LOAD_ALERT_THRESHOLD", DEFAULT_LOAD_THRESHOLD, non_negative),
        };

        let contamination = resolve(&source, "MODEL_CONTAMINATION", "auto".to_string(), |v: &String| {
            v.parse::<Contamination>().map(|_| ())
        })
        .parse()
        .unwrap_or_default();

        let model = ModelConfig {
            path: PathBuf::from(resolve(
                &source,
                "MODEL_PATH",
                DEFAULT_MODEL_PATH.to_string(),
                |v: &String| {
                    if v.trim().is_empty() {
                        Err("path is empty".to_string())
                    } else {
                        Ok(())
                    }
                },
            )),
            training_samples: resolve(
                &source,
                "MODEL_TRAINING_SAMPLES",
                DEFAULT_TRAINING_SAMPLES,
                |v: &usize| {
                    if *v >= MIN_TRAINING_SAMPLES {
                        Ok(())
                    } else {
                        Err(format!("at least {} samples required", MIN_TRAINING_SAMPLES))
                    }
                },
            ),
            n_trees: resolve(&source, "MODEL_TREES", DEFAULT_TREES, |v: &usize| {
                if (1..=1000).contains(v) {
                    Ok(())
                } else {
                    Err("tree count must be between 1 and 1000".to_string())
                }
            }),
            max_samples: DEFAULT_MAX_SAMPLES,
            contamination,
            seed: Some(resolve(&source, "MODEL_SEED", DEFAULT_SEED, |_: &u64| Ok(()))),
        };

        let timeout_secs = resolve(
            &source,
            "SMTP_TIMEOUT_SECS",
            MAX_SMTP_TIMEOUT.as_secs(),
            |v: &u64| {
                if (1..=MAX_SMTP_TIMEOUT.as_secs()).contains(v) {
                    Ok(())
                } else {
                    Err(format!("timeout must be 1-{}s", MAX_SMTP_TIMEOUT.as_secs()))
                }
            },
        );

        let smtp = SmtpConfig {
            host: resolve(&source, "SMTP_HOST", DEFAULT_SMTP_HOST.to_string(), |_: &String| Ok(())),
            port: resolve(&source, "SMTP_PORT", DEFAULT_SMTP_PORT, |v: &u16| {
                if *v == 0 {
                    Err("port 0 is not usable".to_string())
                } else {
                    Ok(())
                }
            }),
            username: optional(&source, "GMAIL_USERNAME"),
            password: optional(&source, "GMAIL_PASSWORD"),
            receiver: optional(&source, "RECEIVER_EMAIL"),
            timeout: Duration::from_secs(timeout_secs),
        };

        let window_ms = resolve(
            &source,
            "SAMPLE_WINDOW_MS",
            DEFAULT_SAMPLE_WINDOW.as_millis() as u64,
            |v: &u64| {
                if *v as u128 >= MIN_SAMPLE_WINDOW.as_millis() {
                    Ok(())
                } else {
                    Err(format!("window must be at least {}ms", MIN_SAMPLE_WINDOW.as_millis()))
                }
            },
        );

        Self {
            thresholds,
            model,
            smtp,
            sample_window: Duration::from_millis(window_ms),
        }
    }
}

/// Read a key, distinguishing "absent" from "present but unusable"
fn read<T: DeserializeOwned>(source: &Config, key: &str) -> Result<Option<T>, MonitorError> {
    match source.get::<T>(&key.to_lowercase()) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(MonitorError::Configuration {
            key: key.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn resolve<T, F>(source: &Config, key: &str, default: T, validate: F) -> T
where
    T: DeserializeOwned + fmt::Debug,
    F: Fn(&T) -> Result<(), String>,
{
    let checked = read::<T>(source, key).and_then(|value| match value {
        Some(v) => validate(&v)
            .map(|_| Some(v))
            .map_err(|reason| MonitorError::Configuration {
                key: key.to_string(),
                reason,
            }),
        None => Ok(None),
    });

    match checked {
        Ok(Some(value)) => value,
        Ok(None) => default,
        Err(err) => {
            warn!(
                event = "config_fallback",
                key = %key,
                error = %err,
                default = ?default,
                "Invalid configuration value, using default"
            );
            default
        }
    }
}

fn optional(source: &Config, key: &str) -> Option<String> {
    resolve::<Option<String>, _>(source, key, None, |_| Ok(()))
        .filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = MonitorConfig::from_vars(Vec::<(String, String)>::new());

        assert_eq!(config.thresholds, ThresholdConfig::default());
        assert_eq!(config.model.path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(config.model.contamination, Contamination::Auto);
        assert_eq!(config.smtp.port, 587);
        assert!(!config.smtp.is_configured());
        assert_eq!(config.sample_window, DEFAULT_SAMPLE_WINDOW);
    }

    #[test]
    fn test_thresholds_from_vars() {
        let config = MonitorConfig::from_vars([
            ("CPU_ALERT_THRESHOLD", "90.5"),
            ("MEMORY_ALERT_THRESHOLD", "70"),
            ("LOAD_ALERT_THRESHOLD", "2.5"),
        ]);

        assert_eq!(config.thresholds.cpu_threshold, 90.5);
        assert_eq!(config.thresholds.memory_threshold, 70.0);
        assert_eq!(config.thresholds.load_threshold, 2.5);
    }

    #[test]
    fn test_invalid_threshold_falls_back_per_key() {
        let config = MonitorConfig::from_vars([
            ("CPU_ALERT_THRESHOLD", "lots"),
            ("MEMORY_ALERT_THRESHOLD", "-3"),
            ("LOAD_ALERT_THRESHOLD", "7"),
        ]);

        assert_eq!(config.thresholds.cpu_threshold, DEFAULT_CPU_THRESHOLD);
        assert_eq!(config.thresholds.memory_threshold, DEFAULT_MEMORY_THRESHOLD);
        assert_eq!(config.thresholds.load_threshold, 7.0);
    }

    #[test]
    fn test_model_settings() {
        let config = MonitorConfig::from_vars([
            ("MODEL_PATH", "/tmp/hostwatch/model.bin"),
            ("MODEL_TRAINING_SAMPLES", "500"),
            ("MODEL_TREES", "50"),
            ("MODEL_CONTAMINATION", "0.01"),
            ("MODEL_SEED", "7"),
        ]);

        assert_eq!(config.model.path, PathBuf::from("/tmp/hostwatch/model.bin"));
        assert_eq!(config.model.training_samples, 500);
        assert_eq!(config.model.n_trees, 50);
        assert_eq!(config.model.contamination, Contamination::Fraction(0.01));
        assert_eq!(config.model.seed, Some(7));
    }

    #[test]
    fn test_too_few_training_samples_rejected() {
        let config = MonitorConfig::from_vars([("MODEL_TRAINING_SAMPLES", "10")]);
        assert_eq!(config.model.training_samples, DEFAULT_TRAINING_SAMPLES);
    }

    #[test]
    fn test_smtp_credentials_require_all_fields() {
        let partial = MonitorConfig::from_vars([
            ("GMAIL_USERNAME", "ops@example.com"),
            ("GMAIL_PASSWORD", "secret"),
        ]);
        assert!(partial.smtp.credentials().is_none());

        let full = MonitorConfig::from_vars([
            ("GMAIL_USERNAME", "ops@example.com"),
            ("GMAIL_PASSWORD", "secret"),
            ("RECEIVER_EMAIL", "oncall@example.com"),
            ("SMTP_TIMEOUT_SECS", "30"),
        ]);
        assert_eq!(
            full.smtp.credentials(),
            Some(("ops@example.com", "secret", "oncall@example.com"))
        );
        // Out-of-range timeout keeps the 10s ceiling
        assert_eq!(full.smtp.timeout, MAX_SMTP_TIMEOUT);
    }

    #[test]
    fn test_blank_smtp_credential_disables_alerts() {
        let config = MonitorConfig::from_vars([
            ("GMAIL_USERNAME", "ops@example.com"),
            ("GMAIL_PASSWORD", "   "),
            ("RECEIVER_EMAIL", "oncall@example.com"),
        ]);

        assert!(config.smtp.credentials().is_none());
        assert!(!config.smtp.is_configured());
    }

    #[test]
    fn test_smtp_debug_redacts_password() {
        let smtp = SmtpConfig {
            password: Some("hunter2".to_string()),
            ..SmtpConfig::default()
        };
        let rendered = format!("{:?}", smtp);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_sample_window_minimum() {
        let config = MonitorConfig::from_vars([("SAMPLE_WINDOW_MS", "20")]);
        assert_eq!(config.sample_window, DEFAULT_SAMPLE_WINDOW);

        let config = MonitorConfig::from_vars([("SAMPLE_WINDOW_MS", "500")]);
        assert_eq!(config.sample_window, Duration::from_millis(500));
    }

    #[test]
    fn test_contamination_parsing() {
        assert_eq!("auto".parse::<Contamination>(), Ok(Contamination::Auto));
        assert_eq!("AUTO".parse::<Contamination>(), Ok(Contamination::Auto));
        assert_eq!(
            "0.05".parse::<Contamination>(),
            Ok(Contamination::Fraction(0.05))
        );
        assert!("0.9".parse::<Contamination>().is_err());
        assert!("none".parse::<Contamination>().is_err());
    }
}
