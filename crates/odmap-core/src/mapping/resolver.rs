//! Per-target value resolution against a record

use super::pipeline::TransformPipeline;
use crate::specification::Rule;
use crate::{Record, Result, Value};

/// Outcome of resolving one rule
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The source key was present; the value went through the pipeline
    Resolved(Value),
    /// The source key was missing and the default was used verbatim
    Defaulted(Value),
    /// Nothing to emit; the target is not produced
    Absent,
}

impl Resolution {
    /// Whether the target counts as produced
    pub fn produced(&self) -> bool {
        !matches!(self, Resolution::Absent)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Resolution::Resolved(value) | Resolution::Defaulted(value) => Some(value),
            Resolution::Absent => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Resolution::Resolved(value) | Resolution::Defaulted(value) => Some(value),
            Resolution::Absent => None,
        }
    }
}

/// Resolves rules against one external record
#[derive(Debug, Clone, Copy)]
pub struct FieldResolver<'r> {
    record: &'r Record,
}

impl<'r> FieldResolver<'r> {
    pub fn new(record: &'r Record) -> Self {
        Self { record }
    }

    /// Resolve a rule
    ///
    /// A present source key runs the pipeline, even when its value is blank.
    /// A missing key falls back to the default without running the pipeline.
    pub fn resolve(&self, rule: &Rule) -> Result<Resolution> {
        if let Some(value) = rule.source_key().and_then(|key| self.record.get(key)) {
            let transformed = TransformPipeline::new(rule.directives()).apply(value.clone())?;
            return Ok(Resolution::Resolved(transformed));
        }

        Ok(match rule.default_value() {
            Some(default) => Resolution::Defaulted(default.clone()),
            None => Resolution::Absent,
        })
    }
}
