//! Transform pipeline for a single value
//!
//! The directives of a [`FieldRule`] are applied in a fixed order. Steps
//! whose directive is absent are skipped. Only date normalization can fail.
//!
//! Copyright (c) 2025 odmap contributors
//! Licensed under the Apache-2.0 license

use super::date;
use crate::specification::FieldRule;
use crate::{Result, Value};
use std::fmt;

/// One step of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformStep {
    BlankDefault,
    Substitution,
    SplitList,
    DateNormalization,
    Casing,
    BooleanSubstitution,
    Scale,
}

impl TransformStep {
    /// Execution order of the steps
    pub const ORDER: [TransformStep; 7] = [
        TransformStep::BlankDefault,
        TransformStep::Substitution,
        TransformStep::SplitList,
        TransformStep::DateNormalization,
        TransformStep::Casing,
        TransformStep::BooleanSubstitution,
        TransformStep::Scale,
    ];

    fn is_configured(&self, rule: &FieldRule) -> bool {
        match self {
            TransformStep::BlankDefault => rule.default.is_some(),
            TransformStep::Substitution => rule.substitution.is_some(),
            TransformStep::SplitList => rule.split_list,
            TransformStep::DateNormalization => rule.input_date_format.is_some() || rule.as_date,
            TransformStep::Casing => rule.strip || rule.upper || rule.lower,
            TransformStep::BooleanSubstitution => rule.boolean_substitution.is_some(),
            TransformStep::Scale => rule.scale.is_some(),
        }
    }
}

impl fmt::Display for TransformStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransformStep::BlankDefault => "blank_default",
            TransformStep::Substitution => "substitution",
            TransformStep::SplitList => "split_list",
            TransformStep::DateNormalization => "date_normalization",
            TransformStep::Casing => "casing",
            TransformStep::BooleanSubstitution => "boolean_substitution",
            TransformStep::Scale => "scale",
        };
        f.write_str(name)
    }
}

/// Applies the directives of one rule to a value
#[derive(Debug, Clone, Copy)]
pub struct TransformPipeline<'a> {
    rule: &'a FieldRule,
}

impl<'a> TransformPipeline<'a> {
    pub fn new(rule: &'a FieldRule) -> Self {
        Self { rule }
    }

    /// Steps that will run, in order
    pub fn configured_steps(&self) -> Vec<TransformStep> {
        TransformStep::ORDER
            .iter()
            .copied()
            .filter(|step| step.is_configured(self.rule))
            .collect()
    }

    /// Run every configured step over `value`
    pub fn apply(&self, value: Value) -> Result<Value> {
        let mut current = value;
        for step in TransformStep::ORDER {
            if !step.is_configured(self.rule) {
                continue;
            }
            current = self.apply_step(step, current)?;
            tracing::trace!(step = %step, value = %current, "applied transform step");
        }
        Ok(current)
    }

    fn apply_step(&self, step: TransformStep, value: Value) -> Result<Value> {
        let rule = self.rule;
        let result = match step {
            TransformStep::BlankDefault => match &rule.default {
                Some(default) if value.is_blank() => default.clone(),
                _ => value,
            },
            TransformStep::Substitution => substitute(value, rule),
            TransformStep::SplitList => match value {
                Value::String(text) => split_list(&text),
                other => other,
            },
            TransformStep::DateNormalization => {
                match date::normalize(&value, rule.input_date_format.as_deref())? {
                    Some(normalized) => Value::String(normalized),
                    None => Value::Null,
                }
            }
            TransformStep::Casing => match value {
                Value::String(text) => Value::String(apply_casing(text, rule)),
                other => other,
            },
            TransformStep::BooleanSubstitution => {
                let mapped = match (&rule.boolean_substitution, &value) {
                    (Some(table), Value::String(key)) => table.get(key).copied(),
                    _ => None,
                };
                Value::Bool(mapped.unwrap_or_else(|| value.truthy()))
            }
            TransformStep::Scale => match (rule.scale, value.to_f64()) {
                (Some(factor), Some(number)) if !value.is_null() => Value::Float(number * factor),
                _ => value,
            },
        };
        Ok(result)
    }
}

fn substitute(value: Value, rule: &FieldRule) -> Value {
    let replacement = match (&rule.substitution, &value) {
        (Some(table), Value::String(key)) => table.get(key).cloned(),
        _ => None,
    };
    replacement.unwrap_or(value)
}

fn split_list(text: &str) -> Value {
    Value::List(
        text.split([',', ';'])
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(Value::from)
            .collect(),
    )
}

fn apply_casing(mut text: String, rule: &FieldRule) -> String {
    if rule.strip {
        text = text.trim().to_string();
    }
    if rule.upper {
        text = text.to_uppercase();
    }
    if rule.lower {
        text = text.to_lowercase();
    }
    text
}
