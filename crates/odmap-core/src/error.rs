//! Error types for the odmap core library
//!
//! This module defines the error handling system for odmap, using thiserror
//! for the error definitions and anyhow for optional error sources.

use std::fmt;
use thiserror::Error;

/// Main error type for odmap operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed mapping document, unknown variable kind or bad engine config
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The external record is not a flat key-value structure
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// A date value could not be parsed
    #[error("Invalid date '{value}'{}: {reason}", format_hint(.format))]
    InvalidDate {
        value: String,
        format: Option<String>,
        reason: String,
    },

    /// A value could not be converted to the declared variable kind
    #[error("Cannot coerce value {value} of '{target}' to {kind}")]
    TypeCoercion {
        target: String,
        kind: String,
        value: String,
    },

    /// Required targets were not produced by the mapping
    #[error("Missing required targets: {}", .missing.join(", "))]
    MissingRequiredFields { missing: Vec<String> },

    /// A request was requested before any successful build
    #[error("No decision request has been built yet")]
    NoRequestBuilt,

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parsing errors
    #[error("YAML error: {message}")]
    Yaml {
        message: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

fn format_hint(format: &Option<String>) -> String {
    match format {
        Some(f) => format!(" (expected format '{}')", f),
        None => String::new(),
    }
}

impl Error {
    /// Create a configuration error without a source
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput {
            message: message.into(),
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::InvalidInput { .. } => ErrorKind::InvalidInput,
            Error::InvalidDate { .. } => ErrorKind::InvalidDate,
            Error::TypeCoercion { .. } => ErrorKind::TypeCoercion,
            Error::MissingRequiredFields { .. } => ErrorKind::MissingRequiredFields,
            Error::NoRequestBuilt => ErrorKind::NoRequestBuilt,
            Error::Json { .. } | Error::Yaml { .. } | Error::Io { .. } => ErrorKind::Io,
        }
    }
}

/// Coarse classification of errors, used by tooling to match expectations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    InvalidInput,
    InvalidDate,
    TypeCoercion,
    MissingRequiredFields,
    NoRequestBuilt,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::InvalidInput => write!(f, "invalid_input"),
            ErrorKind::InvalidDate => write!(f, "invalid_date"),
            ErrorKind::TypeCoercion => write!(f, "type_coercion"),
            ErrorKind::MissingRequiredFields => write!(f, "missing_required_fields"),
            ErrorKind::NoRequestBuilt => write!(f, "no_request_built"),
            ErrorKind::Io => write!(f, "io"),
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::configuration("unknown variable kind 'decimal'");
        assert_eq!(
            err.to_string(),
            "Configuration error: unknown variable kind 'decimal'"
        );
    }

    #[test]
    fn test_missing_fields_display_lists_all() {
        let err = Error::MissingRequiredFields {
            missing: vec!["loanAmount".to_string(), "termMonths".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Missing required targets: loanAmount, termMonths"
        );
    }

    #[test]
    fn test_invalid_date_display() {
        let err = Error::InvalidDate {
            value: "31/02/2023".to_string(),
            format: Some("%d/%m/%Y".to_string()),
            reason: "input is out of range".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid date '31/02/2023' (expected format '%d/%m/%Y'): input is out of range"
        );

        let err = Error::InvalidDate {
            value: "soon".to_string(),
            format: None,
            reason: "premature end of input".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid date 'soon': premature end of input");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::NoRequestBuilt.kind(), ErrorKind::NoRequestBuilt);
        assert_eq!(Error::invalid_input("x").kind(), ErrorKind::InvalidInput);
        assert_eq!(ErrorKind::TypeCoercion.to_string(), "type_coercion");
    }
}
