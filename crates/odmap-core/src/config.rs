//! Engine configuration
//!
//! Configuration is merged from:
//! - Default values
//! - Configuration files (YAML/JSON)
//! - Environment variables

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Longest identifier suffix a v4 UUID can supply
pub const MAX_IDENTIFIER_LENGTH: usize = 32;

/// Settings shared by every build of a [`DecisionEngine`](crate::DecisionEngine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fail builds that leave required targets unproduced
    pub validate_required: bool,

    /// Prefix of generated decision identifiers
    pub identifier_prefix: String,

    /// Hex characters after the prefix, clamped to 1..=32
    pub identifier_length: usize,

    /// Indent width of serialized requests; 0 means compact
    pub json_indent: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            validate_required: true,
            identifier_prefix: "Decision_".to_string(),
            identifier_length: 12,
            json_indent: 2,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON or YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        );

        if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| Error::Configuration {
                message: format!("Invalid config file {}: {}", path.display(), e),
                source: Some(e.into()),
            })
        } else {
            serde_json::from_str(&content).map_err(|e| Error::Configuration {
                message: format!("Invalid config file {}: {}", path.display(), e),
                source: Some(e.into()),
            })
        }
    }

    /// Apply `ODMAP_*` environment overrides
    pub fn merge_with_env(self) -> Result<Self> {
        self.merge_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn merge_with<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("ODMAP_VALIDATE_REQUIRED") {
            self.validate_required = parse_flag("ODMAP_VALIDATE_REQUIRED", &value)?;
        }
        if let Some(prefix) = lookup("ODMAP_IDENTIFIER_PREFIX") {
            self.identifier_prefix = prefix;
        }
        if let Some(value) = lookup("ODMAP_JSON_INDENT") {
            self.json_indent = value.trim().parse().map_err(|e| Error::Configuration {
                message: format!("ODMAP_JSON_INDENT must be a non-negative integer, got '{}'", value),
                source: Some(anyhow::Error::new(e)),
            })?;
        }
        Ok(self)
    }

    /// Identifier length within the supported range
    pub fn effective_identifier_length(&self) -> usize {
        self.identifier_length.clamp(1, MAX_IDENTIFIER_LENGTH)
    }

    pub fn with_validate_required(mut self, enabled: bool) -> Self {
        self.validate_required = enabled;
        self
    }

    pub fn with_identifier_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.identifier_prefix = prefix.into();
        self
    }

    pub fn with_identifier_length(mut self, length: usize) -> Self {
        self.identifier_length = length;
        self
    }

    pub fn with_json_indent(mut self, indent: usize) -> Self {
        self.json_indent = indent;
        self
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::configuration(format!(
            "{} must be a boolean flag, got '{}'",
            key, value
        ))),
    }
}
