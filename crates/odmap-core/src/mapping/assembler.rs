//! Request assembly
//!
//! The assembler drives resolution over every rule of a specification,
//! layering resolved values over constants, and finishes with required-target
//! validation.
//!
//! Copyright (c) 2025 odmap contributors
//! Licensed under the Apache-2.0 license

use super::collections::TypedCollections;
use super::resolver::{FieldResolver, Resolution};
use super::validator::{ProducedTargets, RequiredFieldValidator};
use crate::specification::{MappingSpecification, TargetRule};
use crate::types::{CoRequest, DecisionRequest};
use crate::{Record, Result, Value, VariableKind};

/// A `coRequest` together with the targets that produced values
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub co_request: CoRequest,
    pub produced: ProducedTargets,
}

/// Builds request payloads from records for one specification
#[derive(Debug, Clone, Copy)]
pub struct RequestAssembler<'s> {
    specification: &'s MappingSpecification,
    validate_required: bool,
}

impl<'s> RequestAssembler<'s> {
    pub fn new(specification: &'s MappingSpecification) -> Self {
        Self {
            specification,
            validate_required: true,
        }
    }

    /// Enable or disable required-target validation
    pub fn validate_required(mut self, enabled: bool) -> Self {
        self.validate_required = enabled;
        self
    }

    /// Resolve every rule against `record` and validate the result
    pub fn resolve(&self, record: &Record) -> Result<Assembly> {
        let spec = self.specification;
        let span = tracing::debug_span!(
            "assemble",
            scalar_rules = spec.scalar_rules().len(),
            variable_rules = spec.rule_count() - spec.scalar_rules().len(),
            required = spec.required_targets().len(),
        );
        let _enter = span.enter();

        let resolver = FieldResolver::new(record);
        let mut produced = ProducedTargets::new();

        let mut fields = serde_json::Map::new();
        for constant in spec.constant_scalars() {
            fields.insert(constant.target.clone(), constant.value.to_json());
        }
        for target_rule in spec.scalar_rules() {
            if let Some(value) = resolve_target(&resolver, target_rule, &mut produced)? {
                // an existing constant keeps its position
                fields.insert(target_rule.target.clone(), value.to_json());
            }
        }

        let mut collections = TypedCollections::new();
        for (kind, constants) in spec.constant_variables() {
            for constant in constants {
                collections.add(*kind, &constant.target, &constant.value)?;
            }
        }
        for (kind, rules) in spec.variable_rules() {
            for target_rule in rules {
                if let Some(value) = resolve_target(&resolver, target_rule, &mut produced)? {
                    add_variable(&mut collections, *kind, target_rule, &value)?;
                }
            }
        }

        let co_request = collections.into_co_request(fields);

        let validator =
            RequiredFieldValidator::new(spec.required_targets()).enabled(self.validate_required);
        if let Err(err) = validator.check(&produced) {
            tracing::warn!(error = %err, "required targets were not produced");
            return Err(err);
        }

        tracing::debug!(produced = produced.len(), "assembled request payload");
        Ok(Assembly {
            co_request,
            produced,
        })
    }

    /// Resolve `record` and wrap the payload with `decision_id`
    pub fn assemble(&self, record: &Record, decision_id: impl Into<String>) -> Result<DecisionRequest> {
        let assembly = self.resolve(record)?;
        Ok(DecisionRequest::new(decision_id, assembly.co_request))
    }
}

fn resolve_target(
    resolver: &FieldResolver<'_>,
    target_rule: &TargetRule,
    produced: &mut ProducedTargets,
) -> Result<Option<Value>> {
    let target = target_rule.target.as_str();
    let resolution = resolver.resolve(&target_rule.rule).map_err(|err| {
        tracing::warn!(target_name = target, error = %err, "failed to resolve target");
        err
    })?;

    match &resolution {
        Resolution::Resolved(value) => tracing::trace!(target_name = target, value = %value, "resolved"),
        Resolution::Defaulted(value) => {
            tracing::debug!(target_name = target, value = %value, "source key missing, using default")
        }
        Resolution::Absent => tracing::trace!(target_name = target, "absent"),
    }

    if resolution.produced() {
        produced.insert(target);
    }
    Ok(resolution.into_value())
}

fn add_variable(
    collections: &mut TypedCollections,
    kind: VariableKind,
    target_rule: &TargetRule,
    value: &Value,
) -> Result<()> {
    let target = target_rule.target.as_str();
    let emitted = collections.add(kind, target, value).map_err(|err| {
        tracing::warn!(target_name = target, kind = %kind, error = %err, "failed to coerce value");
        err
    })?;
    if !emitted {
        tracing::debug!(target_name = target, kind = %kind, "dropped null value");
    }
    Ok(())
}
