//! Field rules of a mapping document
//!
//! A rule is either a bare source key or a full object of optional
//! directives. Directive keys accept the aliases of the document format.
//!
//! Copyright (c) 2025 odmap contributors
//! Licensed under the Apache-2.0 license

use crate::Value;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How one target obtains its value
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Equivalent to a full rule with only `from` set
    Shorthand(String),
    Full(FieldRule),
}

static NO_DIRECTIVES: FieldRule = FieldRule::EMPTY;

impl Rule {
    /// The record key this rule reads, if any
    pub fn source_key(&self) -> Option<&str> {
        match self {
            Rule::Shorthand(key) => Some(key),
            Rule::Full(rule) => rule.from.as_deref(),
        }
    }

    /// Directives to apply; a shorthand rule has none
    pub fn directives(&self) -> &FieldRule {
        match self {
            Rule::Shorthand(_) => &NO_DIRECTIVES,
            Rule::Full(rule) => rule,
        }
    }

    /// The configured default, `Some(Value::Null)` for an explicit `null`
    pub fn default_value(&self) -> Option<&Value> {
        self.directives().default.as_ref()
    }
}

impl From<&str> for Rule {
    fn from(key: &str) -> Self {
        Rule::Shorthand(key.to_string())
    }
}

impl From<FieldRule> for Rule {
    fn from(rule: FieldRule) -> Self {
        Rule::Full(rule)
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        match json {
            serde_json::Value::String(key) => Ok(Rule::Shorthand(key)),
            serde_json::Value::Object(fields) => {
                // `date_in: null` asks for ISO date normalization
                let iso_dates = ["date_in", "input_date_format"]
                    .iter()
                    .any(|key| fields.get(*key).is_some_and(serde_json::Value::is_null));
                let mut rule: FieldRule = serde_json::from_value(serde_json::Value::Object(fields))
                    .map_err(de::Error::custom)?;
                rule.as_date |= iso_dates;
                Ok(Rule::Full(rule))
            }
            other => Err(de::Error::custom(format!(
                "expected a source key or a rule object, got {}",
                other
            ))),
        }
    }
}

/// A full rule. Every directive is optional; unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Present with `null` still counts as configured
    #[serde(
        default,
        deserialize_with = "configured",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,

    #[serde(
        rename = "map_from",
        alias = "map",
        alias = "substitution",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub substitution: Option<BTreeMap<String, Value>>,

    #[serde(rename = "split_csv", alias = "split_list", default)]
    pub split_list: bool,

    #[serde(
        rename = "date_in",
        alias = "input_date_format",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub input_date_format: Option<String>,

    #[serde(default)]
    pub as_date: bool,

    #[serde(default)]
    pub strip: bool,

    #[serde(default)]
    pub upper: bool,

    #[serde(default)]
    pub lower: bool,

    #[serde(
        rename = "bool_map",
        alias = "boolean_substitution",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub boolean_substitution: Option<BTreeMap<String, bool>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

fn configured<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl FieldRule {
    /// A rule with no directives at all
    pub const EMPTY: FieldRule = FieldRule {
        from: None,
        default: None,
        substitution: None,
        split_list: false,
        input_date_format: None,
        as_date: false,
        strip: false,
        upper: false,
        lower: false,
        boolean_substitution: None,
        scale: None,
    };

    /// Start a rule reading from `source_key`
    pub fn from_key(source_key: impl Into<String>) -> Self {
        Self {
            from: Some(source_key.into()),
            ..Self::default()
        }
    }

    /// Start a rule that never reads the record
    pub fn unsourced() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Add one entry to the substitution table
    pub fn with_substitution(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.substitution
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_split_list(mut self) -> Self {
        self.split_list = true;
        self
    }

    pub fn with_input_date_format(mut self, format: impl Into<String>) -> Self {
        self.input_date_format = Some(format.into());
        self
    }

    pub fn with_as_date(mut self) -> Self {
        self.as_date = true;
        self
    }

    pub fn with_strip(mut self) -> Self {
        self.strip = true;
        self
    }

    pub fn with_upper(mut self) -> Self {
        self.upper = true;
        self
    }

    pub fn with_lower(mut self) -> Self {
        self.lower = true;
        self
    }

    /// Add one entry to the boolean substitution table
    pub fn with_boolean_substitution(mut self, key: impl Into<String>, value: bool) -> Self {
        self.boolean_substitution
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_scale(mut self, factor: f64) -> Self {
        self.scale = Some(factor);
        self
    }
}

/// A rule bound to its target name
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRule {
    pub target: String,
    pub rule: Rule,
}

impl TargetRule {
    pub fn new(target: impl Into<String>, rule: impl Into<Rule>) -> Self {
        Self {
            target: target.into(),
            rule: rule.into(),
        }
    }
}

/// A literal applied to a target on every build
#[derive(Debug, Clone, PartialEq)]
pub struct TargetConstant {
    pub target: String,
    pub value: Value,
}

impl TargetConstant {
    pub fn new(target: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            target: target.into(),
            value: value.into(),
        }
    }
}
