//! Host sampler backed by sysinfo
//!
//! CPU utilization needs two refreshes separated by an observation window;
//! a single refresh reports zero on most platforms. The whole read happens
//! on the blocking pool so the async request path never sleeps.

use std::time::Duration;

use sysinfo::{CpuExt, System, SystemExt};

use super::{async_trait, MetricsSampler};
use crate::config::MIN_SAMPLE_WINDOW;
use crate::error::{MonitorError, MonitorResult};
use crate::models::MetricSample;
use crate::observability::StructuredLogger;

/// Whether this platform exposes a load average
pub fn load_average_supported() -> bool {
    cfg!(unix)
}

/// Raw reading before conversion into a [`MetricSample`]
#[derive(Debug, Clone, Copy)]
struct HostReading {
    cpu_percent: f64,
    memory_percent: f64,
    load_one: Option<f64>,
}

impl HostReading {
    fn into_sample(self) -> MetricSample {
        match self.load_one {
            Some(load) => MetricSample::new(self.cpu_percent, self.memory_percent, load),
            None => MetricSample::without_load(self.cpu_percent, self.memory_percent),
        }
    }
}

/// Reads CPU, memory and load average from the running host
pub struct SystemSampler {
    window: Duration,
    load_available: bool,
    logger: StructuredLogger,
}

impl SystemSampler {
    /// Create a sampler averaging CPU over `window` (never below 100ms)
    pub fn new(window: Duration, logger: StructuredLogger) -> Self {
        Self {
            window: window.max(MIN_SAMPLE_WINDOW),
            load_available: load_average_supported(),
            logger,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[async_trait]
impl MetricsSampler for SystemSampler {
    async fn sample(&self) -> MonitorResult<MetricSample> {
        let window = self.window;
        let with_load = self.load_available;

        let reading = match tokio::task::spawn_blocking(move || read_host(window, with_load)).await
        {
            Ok(result) => result,
            Err(e) => Err(MonitorError::Acquisition(format!(
                "sampling task failed: {}",
                e
            ))),
        };

        match reading {
            Ok(reading) => Ok(reading.into_sample()),
            Err(err) => {
                self.logger.log_sampling_failed(&err.to_string());
                Err(err)
            }
        }
    }

    fn name(&self) -> &str {
        "system"
    }
}

fn read_host(window: Duration, with_load: bool) -> MonitorResult<HostReading> {
    let mut system = System::new();

    system.refresh_cpu();
    std::thread::sleep(window);
    system.refresh_cpu();

    if system.cpus().is_empty() {
        return Err(MonitorError::Acquisition(
            "no CPU information available".to_string(),
        ));
    }
    let cpu_percent = f64::from(system.global_cpu_info().cpu_usage());

    system.refresh_memory();
    let total = system.total_memory();
    if total == 0 {
        return Err(MonitorError::Acquisition(
            "total memory reported as zero".to_string(),
        ));
    }
    let memory_percent = system.used_memory() as f64 / total as f64 * 100.0;

    let load_one = with_load.then(|| system.load_average().one);

    Ok(HostReading {
        cpu_percent: cpu_percent.clamp(0.0, 100.0),
        memory_percent: memory_percent.clamp(0.0, 100.0),
        load_one,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_never_below_minimum() {
        let sampler = SystemSampler::new(Duration::from_millis(10), StructuredLogger::default());
        assert_eq!(sampler.window(), MIN_SAMPLE_WINDOW);

        let sampler = SystemSampler::new(Duration::from_millis(250), StructuredLogger::default());
        assert_eq!(sampler.window(), Duration::from_millis(250));
    }

    #[test]
    fn test_reading_without_load() {
        let reading = HostReading {
            cpu_percent: 12.0,
            memory_percent: 34.0,
            load_one: None,
        };
        let sample = reading.into_sample();
        assert!(!sample.load_available);
        assert_eq!(sample.load_avg, 0.0);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_sample_reads_host() {
        let sampler = SystemSampler::new(Duration::from_millis(100), StructuredLogger::default());
        let sample = sampler.sample().await.unwrap();

        assert!(sample.is_valid());
        assert!(sample.load_available);
        assert!(sample.memory_usage > 0.0);
    }
}
