//! Structured logging setup
//!
//! The engine emits `tracing` events; this module installs a global
//! subscriber for applications that do not bring their own. Output goes to
//! stderr in compact, full or JSON form.

use crate::{Error, Result};
use is_terminal::IsTerminal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: String,
    /// Output format: compact, full, json
    pub format: LogFormat,
    /// Allow ANSI colors when stderr is a terminal
    pub ansi: bool,
    /// Include thread IDs
    pub thread_ids: bool,
    /// Include file and line numbers
    pub source_location: bool,
    /// Log span close events with their timing
    pub span_events: bool,
    /// Per-module level overrides
    pub module_filter: Option<BTreeMap<String, String>>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact format for production
    Compact,
    /// Full format with all details
    Full,
    /// JSON structured format
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "full" => Ok(LogFormat::Full),
            "json" => Ok(LogFormat::Json),
            other => Err(Error::configuration(format!("Invalid log format: {}", other))),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            ansi: true,
            thread_ids: false,
            source_location: false,
            span_events: false,
            module_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Create logging config from verbosity level
    pub fn from_verbosity(verbosity: u8) -> Self {
        let mut config = Self::default();

        match verbosity {
            0 => {
                config.level = "warn".to_string();
            }
            1 => {
                config.level = "info".to_string();
            }
            2 => {
                config.level = "debug".to_string();
                config.source_location = true;
            }
            _ => {
                config.level = "trace".to_string();
                config.format = LogFormat::Full;
                config.source_location = true;
                config.thread_ids = true;
                config.span_events = true;
            }
        }

        config
    }

    /// Apply `RUST_LOG` and `ODMAP_LOG_FORMAT` overrides
    pub fn merge_with_env(&mut self) {
        self.merge_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn merge_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // RUST_LOG takes precedence
        if let Some(rust_log) = lookup("RUST_LOG") {
            self.level = rust_log;
        }

        if let Some(format) = lookup("ODMAP_LOG_FORMAT") {
            match format.parse() {
                Ok(parsed) => self.format = parsed,
                Err(_) => tracing::warn!("Invalid log format: {}, using default", format),
            }
        }
    }

    /// Add a per-module level override
    pub fn with_module_level(mut self, module: impl Into<String>, level: impl Into<String>) -> Self {
        self.module_filter
            .get_or_insert_with(BTreeMap::new)
            .insert(module.into(), level.into());
        self
    }
}

/// Initialize the global logging system
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = create_env_filter(config)?;
    let ansi = config.ansi && std::io::stderr().is_terminal();
    let span_events = if config.span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(config.thread_ids)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_span_events(span_events);

    // each format yields a different subscriber type
    let installed = match config.format {
        LogFormat::Compact => {
            tracing::subscriber::set_global_default(builder.with_ansi(ansi).compact().finish())
        }
        LogFormat::Full => tracing::subscriber::set_global_default(builder.with_ansi(ansi).finish()),
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.with_ansi(false).json().finish())
        }
    };
    installed.map_err(|e| Error::Configuration {
        message: format!("Failed to initialize logging: {}", e),
        source: Some(anyhow::Error::new(e)),
    })?;

    tracing::debug!(config = ?config, "Logging system initialized");
    Ok(())
}

/// Create environment filter based on configuration
fn create_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if let Some(module_filters) = &config.module_filter {
        for (module, level) in module_filters {
            let directive = format!("{}={}", module, level).parse::<Directive>().map_err(|e| {
                Error::Configuration {
                    message: format!("Invalid filter directive: {}", e),
                    source: Some(anyhow::Error::new(e)),
                }
            })?;
            filter = filter.add_directive(directive);
        }
    }

    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_from_verbosity() {
        let config = LoggingConfig::from_verbosity(0);
        assert_eq!(config.level, "warn");
        assert!(!config.source_location);

        let config = LoggingConfig::from_verbosity(2);
        assert_eq!(config.level, "debug");
        assert!(config.source_location);

        let config = LoggingConfig::from_verbosity(3);
        assert_eq!(config.level, "trace");
        assert_eq!(config.format, LogFormat::Full);
        assert!(config.thread_ids);
        assert!(config.span_events);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = LoggingConfig::default();
        config.merge_with(|key| match key {
            "RUST_LOG" => Some("odmap_core=trace".to_string()),
            "ODMAP_LOG_FORMAT" => Some("JSON".to_string()),
            _ => None,
        });
        assert_eq!(config.level, "odmap_core=trace");
        assert_eq!(config.format, LogFormat::Json);

        let mut config = LoggingConfig::default();
        config.merge_with(|key| (key == "ODMAP_LOG_FORMAT").then(|| "xml".to_string()));
        assert_eq!(config.format, LogFormat::Compact);
    }

    #[test]
    fn test_invalid_module_directive() {
        let config = LoggingConfig::default().with_module_level("odmap_core", "loud");
        let err = create_env_filter(&config).unwrap_err();
        assert!(err.to_string().contains("Invalid filter directive"));
    }

    // the only test in this binary that installs a global subscriber
    #[test]
    fn test_init_logging_installs_once() {
        let config = LoggingConfig {
            format: LogFormat::Json,
            ..LoggingConfig::from_verbosity(2)
        }
        .with_module_level("odmap_core::mapping", "trace");

        init_logging(&config).unwrap();
        tracing::info!(target_name = "customerType", "logging installed");

        let err = init_logging(&config).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("Failed to initialize logging"));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("pretty".parse::<LogFormat>().is_err());
    }
}
