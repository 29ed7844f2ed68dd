//! Mapping specifications
//!
//! A [`MappingSpecification`] is parsed once from a JSON or YAML document and
//! is read-only afterwards. Every section keeps document order so the
//! produced collections list entries the way the author wrote them.
//!
//! Copyright (c) 2025 odmap contributors
//! Licensed under the Apache-2.0 license

pub mod rule;

pub use rule::{FieldRule, Rule, TargetConstant, TargetRule};

use crate::{Error, Result, Value, VariableKind};
use serde_json::Map;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Text formats a mapping document can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Guess the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(DocumentFormat::Json),
            "yaml" | "yml" => Some(DocumentFormat::Yaml),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Json => write!(f, "JSON"),
            DocumentFormat::Yaml => write!(f, "YAML"),
        }
    }
}

/// The parsed, immutable form of a mapping document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingSpecification {
    scalar_rules: Vec<TargetRule>,
    variable_rules: Vec<(VariableKind, Vec<TargetRule>)>,
    constant_scalars: Vec<TargetConstant>,
    constant_variables: Vec<(VariableKind, Vec<TargetConstant>)>,
    required_targets: Vec<String>,
}

impl MappingSpecification {
    /// Parse a JSON mapping document
    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::parse(text, DocumentFormat::Json)
    }

    /// Parse a YAML mapping document
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Self::parse(text, DocumentFormat::Yaml)
    }

    /// Parse a document in the given format
    pub fn parse(text: &str, format: DocumentFormat) -> Result<Self> {
        let document: serde_json::Value = match format {
            DocumentFormat::Json => serde_json::from_str(text).map_err(|e| Error::Configuration {
                message: format!("Mapping document is not valid JSON: {}", e),
                source: Some(e.into()),
            })?,
            DocumentFormat::Yaml => serde_yaml::from_str(text).map_err(|e| Error::Configuration {
                message: format!("Mapping document is not valid YAML: {}", e),
                source: Some(e.into()),
            })?,
        };
        Self::from_value(document)
    }

    /// Build a specification from an already parsed document
    pub fn from_value(document: serde_json::Value) -> Result<Self> {
        let mut root = match document {
            serde_json::Value::Null => return Ok(Self::default()),
            serde_json::Value::Object(root) => root,
            other => {
                return Err(Error::configuration(format!(
                    "Mapping document must be an object, got {}",
                    other
                )))
            }
        };

        let scalar_rules = match section(&mut root, "co_fields")? {
            Some(rules) => parse_rules("co_fields", rules)?,
            None => Vec::new(),
        };

        let mut variable_rules = Vec::new();
        if let Some(kinds) = section(&mut root, "variables")? {
            for (kind, rules) in kinds {
                let kind = VariableKind::from_str(&kind)?;
                let context = format!("variables.{}", kind);
                match rules {
                    serde_json::Value::Null => {}
                    serde_json::Value::Object(rules) => {
                        variable_rules.push((kind, parse_rules(&context, rules)?));
                    }
                    other => return Err(not_an_object(&context, &other)),
                }
            }
        }

        let mut constant_scalars = Vec::new();
        let mut constant_variables = Vec::new();
        if let Some(mut constants) = section(&mut root, "constants")? {
            if let Some(fields) = section_at(&mut constants, "co_fields", "constants.co_fields")? {
                constant_scalars = parse_constants("constants.co_fields", fields)?;
            }
            if let Some(kinds) = section_at(&mut constants, "variables", "constants.variables")? {
                for (kind, values) in kinds {
                    let kind = VariableKind::from_str(&kind)?;
                    let context = format!("constants.variables.{}", kind);
                    match values {
                        serde_json::Value::Null => {}
                        serde_json::Value::Object(values) => {
                            constant_variables.push((kind, parse_constants(&context, values)?));
                        }
                        other => return Err(not_an_object(&context, &other)),
                    }
                }
            }
        }

        let required_targets = match root.remove("required_odm") {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(serde_json::Value::Array(items)) => parse_required(items)?,
            Some(other) => {
                return Err(Error::configuration(format!(
                    "'required_odm' must be a list of target names, got {}",
                    other
                )))
            }
        };

        Ok(Self {
            scalar_rules,
            variable_rules,
            constant_scalars,
            constant_variables,
            required_targets,
        })
    }

    /// Add a scalar rule, replacing any existing rule for the same target
    pub fn with_scalar_rule(mut self, target: impl Into<String>, rule: impl Into<Rule>) -> Self {
        upsert_rule(&mut self.scalar_rules, TargetRule::new(target, rule));
        self
    }

    /// Add a typed-variable rule, replacing any existing rule for the same target
    pub fn with_variable_rule(
        mut self,
        kind: VariableKind,
        target: impl Into<String>,
        rule: impl Into<Rule>,
    ) -> Self {
        let rules = entry_for(&mut self.variable_rules, kind);
        upsert_rule(rules, TargetRule::new(target, rule));
        self
    }

    pub fn with_constant_scalar(mut self, target: impl Into<String>, value: impl Into<Value>) -> Self {
        upsert_constant(&mut self.constant_scalars, TargetConstant::new(target, value));
        self
    }

    pub fn with_constant_variable(
        mut self,
        kind: VariableKind,
        target: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        let constants = entry_for(&mut self.constant_variables, kind);
        upsert_constant(constants, TargetConstant::new(target, value));
        self
    }

    /// Mark a target as required; duplicates are ignored
    pub fn with_required(mut self, target: impl Into<String>) -> Self {
        let target = target.into();
        if !self.required_targets.contains(&target) {
            self.required_targets.push(target);
        }
        self
    }

    pub fn scalar_rules(&self) -> &[TargetRule] {
        &self.scalar_rules
    }

    /// Typed-variable rules grouped by kind, in document order
    pub fn variable_rules(&self) -> &[(VariableKind, Vec<TargetRule>)] {
        &self.variable_rules
    }

    /// Rules for one variable kind
    pub fn rules_for(&self, kind: VariableKind) -> &[TargetRule] {
        self.variable_rules
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, rules)| rules.as_slice())
            .unwrap_or(&[])
    }

    pub fn constant_scalars(&self) -> &[TargetConstant] {
        &self.constant_scalars
    }

    pub fn constant_variables(&self) -> &[(VariableKind, Vec<TargetConstant>)] {
        &self.constant_variables
    }

    pub fn required_targets(&self) -> &[String] {
        &self.required_targets
    }

    pub fn is_required(&self, target: &str) -> bool {
        self.required_targets.iter().any(|t| t == target)
    }

    /// Total number of scalar and typed-variable rules
    pub fn rule_count(&self) -> usize {
        self.scalar_rules.len()
            + self
                .variable_rules
                .iter()
                .map(|(_, rules)| rules.len())
                .sum::<usize>()
    }
}

fn section(
    parent: &mut Map<String, serde_json::Value>,
    key: &str,
) -> Result<Option<Map<String, serde_json::Value>>> {
    section_at(parent, key, key)
}

/// Take the object under `key`, naming it `context` in errors
fn section_at(
    parent: &mut Map<String, serde_json::Value>,
    key: &str,
    context: &str,
) -> Result<Option<Map<String, serde_json::Value>>> {
    match parent.remove(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(not_an_object(context, &other)),
    }
}

fn not_an_object(context: &str, value: &serde_json::Value) -> Error {
    Error::configuration(format!("'{}' must be an object, got {}", context, value))
}

fn parse_rules(context: &str, rules: Map<String, serde_json::Value>) -> Result<Vec<TargetRule>> {
    rules
        .into_iter()
        .map(|(target, rule)| {
            let rule: Rule = serde_json::from_value(rule).map_err(|e| Error::Configuration {
                message: format!("Invalid rule for '{}.{}': {}", context, target, e),
                source: Some(e.into()),
            })?;
            Ok(TargetRule { target, rule })
        })
        .collect()
}

fn parse_constants(
    context: &str,
    values: Map<String, serde_json::Value>,
) -> Result<Vec<TargetConstant>> {
    values
        .into_iter()
        .map(|(target, literal)| {
            let value = Value::from_json(literal).ok_or_else(|| {
                Error::configuration(format!(
                    "Constant '{}.{}' must be a literal, not an object",
                    context, target
                ))
            })?;
            Ok(TargetConstant { target, value })
        })
        .collect()
}

fn parse_required(items: Vec<serde_json::Value>) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut required = Vec::with_capacity(items.len());
    for item in items {
        match item {
            serde_json::Value::String(target) => {
                if seen.insert(target.clone()) {
                    required.push(target);
                }
            }
            other => {
                return Err(Error::configuration(format!(
                    "'required_odm' entries must be target names, got {}",
                    other
                )))
            }
        }
    }
    Ok(required)
}

fn entry_for<T>(groups: &mut Vec<(VariableKind, Vec<T>)>, kind: VariableKind) -> &mut Vec<T> {
    let index = match groups.iter().position(|(k, _)| *k == kind) {
        Some(index) => index,
        None => {
            groups.push((kind, Vec::new()));
            groups.len() - 1
        }
    };
    &mut groups[index].1
}

fn upsert_rule(rules: &mut Vec<TargetRule>, rule: TargetRule) {
    match rules.iter_mut().find(|r| r.target == rule.target) {
        Some(existing) => *existing = rule,
        None => rules.push(rule),
    }
}

fn upsert_constant(constants: &mut Vec<TargetConstant>, constant: TargetConstant) {
    match constants.iter_mut().find(|c| c.target == constant.target) {
        Some(existing) => *existing = constant,
        None => constants.push(constant),
    }
}

/// Parse a JSON mapping document
pub fn load_specification(text: &str) -> Result<MappingSpecification> {
    MappingSpecification::from_json_str(text)
}

/// Parse a mapping document in an explicit format
pub fn load_specification_as(text: &str, format: DocumentFormat) -> Result<MappingSpecification> {
    MappingSpecification::parse(text, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    const DOCUMENT: &str = r#"{
        "co_fields": {
            "customerType": {"from": "tipo_cliente", "map_from": {"P": "PARTICULAR"}},
            "postalCode": "cp",
            "channel": {"default": "WEB"}
        },
        "variables": {
            "double": {"loanAmount": {"from": "monto", "scale": 1}},
            "list_double": {"plan": {"from": "plan_amortizacion", "split_csv": true}}
        },
        "constants": {
            "co_fields": {"country": "ES"},
            "variables": {"string": {"source": "BATCH"}}
        },
        "required_odm": ["customerType", "loanAmount", "customerType"]
    }"#;

    #[test]
    fn test_load_sections_in_document_order() {
        let spec = load_specification(DOCUMENT).unwrap();

        let targets: Vec<&str> = spec.scalar_rules().iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, ["customerType", "postalCode", "channel"]);
        assert_eq!(spec.rules_for(VariableKind::Double).len(), 1);
        assert_eq!(spec.rules_for(VariableKind::Integer).len(), 0);
        assert_eq!(spec.rule_count(), 5);
        assert_eq!(spec.constant_scalars()[0], TargetConstant::new("country", "ES"));
        assert_eq!(spec.constant_variables()[0].0, VariableKind::String);
        assert_eq!(spec.required_targets(), ["customerType", "loanAmount"]);
        assert!(spec.is_required("loanAmount"));
    }

    #[test]
    fn test_yaml_document_matches_json() {
        let yaml = r#"
co_fields:
  customerType:
    from: tipo_cliente
    map_from:
      P: PARTICULAR
  postalCode: cp
  channel:
    default: WEB
variables:
  double:
    loanAmount:
      from: monto
      scale: 1
  list_double:
    plan:
      from: plan_amortizacion
      split_csv: true
constants:
  co_fields:
    country: ES
  variables:
    string:
      source: BATCH
required_odm: [customerType, loanAmount, customerType]
"#;
        let from_yaml = MappingSpecification::from_yaml_str(yaml).unwrap();
        let from_json = load_specification(DOCUMENT).unwrap();
        assert_eq!(from_yaml, from_json);
    }

    #[test]
    fn test_missing_and_null_sections() {
        let spec = MappingSpecification::from_value(json!({
            "co_fields": null,
            "variables": {"date": null}
        }))
        .unwrap();
        assert_eq!(spec.rule_count(), 0);
        assert!(spec.required_targets().is_empty());

        let spec = MappingSpecification::from_value(serde_json::Value::Null).unwrap();
        assert_eq!(spec, MappingSpecification::default());
    }

    #[test]
    fn test_unknown_variable_kind_is_configuration_error() {
        let err = MappingSpecification::from_value(json!({
            "variables": {"decimal": {"rate": "tipo"}}
        }))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("decimal"));
    }

    #[test]
    fn test_malformed_documents() {
        let err = load_specification("{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = MappingSpecification::from_value(json!({"co_fields": ["a"]})).unwrap_err();
        assert!(err.to_string().contains("'co_fields' must be an object"));

        let err = MappingSpecification::from_value(json!({"co_fields": {"x": 1}})).unwrap_err();
        assert!(err.to_string().contains("co_fields.x"));

        let err = MappingSpecification::from_value(json!({
            "constants": {"co_fields": {"address": {"cp": "1"}}}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("constants.co_fields.address"));

        let err = MappingSpecification::from_value(json!({"constants": {"co_fields": "x"}})).unwrap_err();
        assert!(err.to_string().contains("'constants.co_fields' must be an object"));

        let err = MappingSpecification::from_value(json!({"constants": {"variables": [1]}})).unwrap_err();
        assert!(err.to_string().contains("'constants.variables' must be an object"));

        let err = MappingSpecification::from_value(json!({"required_odm": [1]})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_programmatic_construction() {
        let spec = MappingSpecification::default()
            .with_scalar_rule("customerType", "tipo_cliente")
            .with_scalar_rule("customerType", FieldRule::from_key("tipo"))
            .with_variable_rule(VariableKind::Integer, "termMonths", "plazo")
            .with_constant_variable(VariableKind::Integer, "version", 2)
            .with_required("termMonths")
            .with_required("termMonths");

        assert_eq!(spec.scalar_rules().len(), 1);
        assert_eq!(spec.scalar_rules()[0].rule.source_key(), Some("tipo"));
        assert_eq!(spec.rules_for(VariableKind::Integer)[0].target, "termMonths");
        assert_eq!(spec.required_targets(), ["termMonths"]);
        assert_eq!(DocumentFormat::from_extension("YML"), Some(DocumentFormat::Yaml));
    }
}
