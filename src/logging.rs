//! Logging initialization.
//!
//! Console output goes to stderr so the report table keeps stdout to
//! itself; file output is an optional daily-rolling log.

use crate::config::LogSection;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Runtime log settings
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log directory for file output
    pub log_dir: PathBuf,
    /// Console output enabled
    pub console_enabled: bool,
    /// File output enabled
    pub file_enabled: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            console_enabled: true,
            file_enabled: false,
        }
    }
}

impl LogConfig {
    pub fn from_section(section: &LogSection) -> Self {
        let mut config = Self::default();
        config.level = section.level.clone();
        config.file_enabled = section.file_enabled;
        if let Some(ref dir) = section.dir {
            config.log_dir = PathBuf::from(dir);
        }
        config
    }
}

fn ensure_log_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Initialize the tracing subscriber.
///
/// The returned guard must stay alive for the life of the process when
/// file output is enabled, or buffered lines are lost on exit.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.file_enabled {
        ensure_log_dir(&config.log_dir)?;
        let file_appender = rolling::daily(&config.log_dir, "promsentinel.log");
        let (file_writer, guard) = non_blocking(file_appender);

        if config.console_enabled {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr.and(file_writer))
                .with_target(true)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true)
                .init();
        }
        Ok(Some(guard))
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.console_enabled);
        assert!(!config.file_enabled);
    }

    #[test]
    fn test_log_config_from_section() {
        let section = LogSection {
            level: "debug".to_string(),
            dir: Some("/tmp/sentinel-logs".to_string()),
            file_enabled: true,
        };
        let config = LogConfig::from_section(&section);
        assert_eq!(config.level, "debug");
        assert!(config.file_enabled);
        assert_eq!(config.log_dir, PathBuf::from("/tmp/sentinel-logs"));
    }

    #[test]
    fn test_ensure_log_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_dir = temp_dir.path().join("test_logs");

        assert!(ensure_log_dir(&log_dir).is_ok());
        assert!(log_dir.exists());
    }
}
