//! Layered configuration: defaults, TOML file, environment overrides.

use crate::collector::{CollectMode, CollectorConfig};
use crate::error::{Error, Result};
use crate::model::ModelConfig;
use crate::pipeline::PipelineConfig;
use crate::retry::RetryStrategy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub detection: DetectionConfig,
    pub retry: RetryConfig,
    pub log: LogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the Prometheus-compatible backend
    pub url: String,
    /// Per-request timeout
    pub timeout_seconds: u64,
    /// Acquisition mode
    pub mode: CollectMode,
    /// Spacing between point queries in poll mode
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Query expression to evaluate
    pub query: String,
    /// Number of samples to collect
    pub sample_count: usize,
    /// Expected anomalous fraction, in (0, 0.5]
    pub contamination: f64,
    /// RNG seed for reproducible runs
    pub seed: u64,
    /// Trees in the ensemble
    pub n_estimators: usize,
    /// Subsample cap per tree
    pub max_samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts for transient source failures; 1 disables retries
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSection {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log directory for file output
    pub dir: Option<String>,
    /// Enable rolling file output
    pub file_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                url: "http://localhost:9090".to_string(),
                timeout_seconds: 10,
                mode: CollectMode::Instant,
                poll_interval_ms: 1000,
            },
            detection: DetectionConfig {
                query: "up".to_string(),
                sample_count: 60,
                contamination: 0.2,
                seed: 42,
                n_estimators: 100,
                max_samples: 256,
            },
            retry: RetryConfig {
                max_attempts: 3,
                initial_delay_ms: 500,
                max_delay_ms: 30_000,
            },
            log: LogSection {
                level: "info".to_string(),
                dir: None,
                file_enabled: false,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then an optional TOML file, then
    /// `SENTINEL_`-prefixed environment variables (`__` as section
    /// separator, e.g. `SENTINEL_DETECTION__SAMPLE_COUNT=120`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder().add_source(
            config::Config::try_from(&AppConfig::default())
                .map_err(|e| Error::Config(e.to_string()))?,
        );

        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "loading configuration file");
            settings = settings.add_source(config::File::from(path));
        } else {
            for candidate in ["promsentinel.toml", "config/promsentinel.toml"] {
                if Path::new(candidate).exists() {
                    debug!(path = candidate, "loading configuration file");
                    settings = settings.add_source(config::File::with_name(candidate));
                    break;
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("SENTINEL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut loaded: AppConfig = settings
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))?;

        // Backend URL shortcut honored for parity with the original tooling
        if let Ok(url) = std::env::var("PROM_URL") {
            loaded.source.url = url;
        }

        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.source.url)
            .map_err(|e| Error::Config(format!("invalid source url {:?}: {e}", self.source.url)))?;
        if self.source.timeout_seconds == 0 {
            return Err(Error::Config(
                "timeout_seconds must be at least 1".to_string(),
            ));
        }
        if self.detection.sample_count == 0 {
            return Err(Error::Config(
                "sample_count must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        self.model_config().validate()
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            contamination: self.detection.contamination,
            seed: self.detection.seed,
            n_estimators: self.detection.n_estimators,
            max_samples: self.detection.max_samples,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            query: self.detection.query.clone(),
            sample_count: self.detection.sample_count,
            collector: CollectorConfig {
                mode: self.source.mode,
                poll_interval: Duration::from_millis(self.source.poll_interval_ms),
            },
            model: self.model_config(),
        }
    }

    pub fn retry_strategy(&self) -> RetryStrategy {
        RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            multiplier: 2.0,
            max_attempts: self.retry.max_attempts,
        }
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds)
    }

    /// Write a commented sample configuration file next to the binary.
    pub fn generate_sample_config(path: &Path) -> Result<()> {
        let toml_content = toml::to_string_pretty(&AppConfig::default())
            .map_err(|e| Error::Config(e.to_string()))?;

        let sample_content = format!(
            r#"# promsentinel configuration
#
# Every value can be overridden with a SENTINEL_-prefixed environment
# variable using __ as the section separator, for example:
#   SENTINEL_DETECTION__SAMPLE_COUNT=120
#   SENTINEL_SOURCE__MODE=poll
# PROM_URL overrides source.url directly.

{toml_content}"#
        );

        std::fs::write(path, sample_content)?;
        Ok(())
    }
}
