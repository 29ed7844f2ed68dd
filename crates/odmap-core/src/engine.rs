//! The decision engine
//!
//! [`DecisionEngine`] owns a specification and an [`EngineConfig`], picks
//! the decision identifier for each build and keeps the last successfully
//! built request.
//!
//! # Example
//!
//! ```
//! use odmap_core::{DecisionEngine, Record, load_specification};
//!
//! # fn example() -> odmap_core::Result<()> {
//! let spec = load_specification(r#"{
//!     "co_fields": {
//!         "customerType": {"from": "tipo_cliente", "map_from": {"P": "PARTICULAR"}}
//!     }
//! }"#)?;
//!
//! let mut engine = DecisionEngine::new(spec);
//! let request = engine.build(&Record::new().with("tipo_cliente", "P"))?;
//! assert_eq!(request.scalar("customerType"), Some(&serde_json::json!("PARTICULAR")));
//!
//! let text = engine.serialize()?;
//! assert!(text.contains("\"__DecisionID__\": \"Decision_"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! Copyright (c) 2025 odmap contributors
//! Licensed under the Apache-2.0 license

use crate::config::{EngineConfig, MAX_IDENTIFIER_LENGTH};
use crate::mapping::RequestAssembler;
use crate::specification::MappingSpecification;
use crate::types::DecisionRequest;
use crate::{Error, Record, Result};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Per-call overrides for [`DecisionEngine::build_with`]
#[derive(Debug, Clone, Default)]
pub struct BuildOptions<'a> {
    /// Use this specification instead of the engine's
    pub specification: Option<&'a MappingSpecification>,
    /// Use this identifier instead of the held or generated one
    pub decision_id: Option<String>,
    /// Override the configured required-target validation
    pub validate_required: Option<bool>,
}

impl<'a> BuildOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn specification(mut self, specification: &'a MappingSpecification) -> Self {
        self.specification = Some(specification);
        self
    }

    pub fn decision_id(mut self, decision_id: impl Into<String>) -> Self {
        self.decision_id = Some(decision_id.into());
        self
    }

    pub fn validate_required(mut self, enabled: bool) -> Self {
        self.validate_required = Some(enabled);
        self
    }
}

/// Builds decision requests from external records
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    specification: Arc<MappingSpecification>,
    config: EngineConfig,
    held_decision_id: Option<String>,
    last_request: Option<DecisionRequest>,
}

impl DecisionEngine {
    /// Create an engine with the default configuration
    pub fn new(specification: impl Into<Arc<MappingSpecification>>) -> Self {
        Self::with_config(specification, EngineConfig::default())
    }

    pub fn with_config(
        specification: impl Into<Arc<MappingSpecification>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            specification: specification.into(),
            config,
            held_decision_id: None,
            last_request: None,
        }
    }

    /// Continue an existing decision: later builds reuse `decision_id`
    pub fn with_decision_id(mut self, decision_id: impl Into<String>) -> Self {
        self.held_decision_id = Some(decision_id.into());
        self
    }

    pub fn specification(&self) -> &MappingSpecification {
        &self.specification
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The identifier the next build will use absent an override
    pub fn decision_id(&self) -> Option<&str> {
        self.held_decision_id.as_deref()
    }

    /// Build a request with the engine's specification and configuration
    pub fn build(&mut self, record: &Record) -> Result<DecisionRequest> {
        self.build_with(record, BuildOptions::default())
    }

    /// Build a request with per-call overrides
    ///
    /// On success the request becomes the last built request and its
    /// identifier is held for later builds. A failed build changes nothing.
    pub fn build_with(&mut self, record: &Record, options: BuildOptions<'_>) -> Result<DecisionRequest> {
        let specification = options
            .specification
            .unwrap_or_else(|| self.specification.as_ref());
        let validate_required = options
            .validate_required
            .unwrap_or(self.config.validate_required);

        // an empty identifier counts as none
        let decision_id = match options
            .decision_id
            .filter(|id| !id.is_empty())
            .or_else(|| self.held_decision_id.clone().filter(|id| !id.is_empty()))
        {
            Some(id) => id,
            None => generate_decision_id(
                &self.config.identifier_prefix,
                self.config.effective_identifier_length(),
            ),
        };

        let span = tracing::info_span!(
            "build",
            decision_id = %decision_id,
            rules = specification.rule_count(),
            record_fields = record.len(),
        );
        let _enter = span.enter();

        let request = RequestAssembler::new(specification)
            .validate_required(validate_required)
            .assemble(record, decision_id)?;

        self.held_decision_id = Some(request.decision_id.clone());
        self.last_request = Some(request.clone());
        tracing::debug!("decision request built");

        Ok(request)
    }

    /// The last successfully built request
    pub fn last_request(&self) -> Option<&DecisionRequest> {
        self.last_request.as_ref()
    }

    /// Serialize the last built request with the configured indent
    pub fn serialize(&self) -> Result<String> {
        let request = self.last_request.as_ref().ok_or(Error::NoRequestBuilt)?;
        serialize(request, self.config.json_indent)
    }

    /// Forget the last built request and the held identifier
    pub fn reset(&mut self) {
        self.held_decision_id = None;
        self.last_request = None;
    }
}

/// Serialize a request as JSON, pretty-printed with `indent` spaces
///
/// An indent of 0 yields compact output. Non-ASCII text is written as is.
pub fn serialize(request: &DecisionRequest, indent: usize) -> Result<String> {
    if indent == 0 {
        return Ok(serde_json::to_string(request)?);
    }

    let indent = " ".repeat(indent);
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    request.serialize(&mut serializer)?;

    String::from_utf8(buffer).map_err(|e| Error::Configuration {
        message: "Serialized request is not valid UTF-8".to_string(),
        source: Some(anyhow::Error::new(e)),
    })
}

/// Generate a fresh identifier: `prefix` followed by `length` hex characters
pub fn generate_decision_id(prefix: &str, length: usize) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    let length = length.clamp(1, MAX_IDENTIFIER_LENGTH);
    format!("{}{}", prefix, &hex[..length])
}
