//! Type-partitioned variable collections
//!
//! Each variable kind has one coercion. Entries keep insertion order and a
//! name appears at most once per collection; a later write replaces the
//! earlier entry in place.

use crate::types::{CoRequest, NamedValue};
use crate::{Error, Result, Value, VariableKind};

/// The five typed collections of a request under construction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedCollections {
    dates: Vec<NamedValue<String>>,
    doubles: Vec<NamedValue<f64>>,
    integers: Vec<NamedValue<i64>>,
    strings: Vec<NamedValue<String>>,
    list_doubles: Vec<NamedValue<Vec<f64>>>,
}

impl TypedCollections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerce `value` to `kind` and write it under `name`
    ///
    /// Returns `Ok(false)` without touching the collection when the value
    /// is null.
    pub fn add(&mut self, kind: VariableKind, name: &str, value: &Value) -> Result<bool> {
        if value.is_null() {
            return Ok(false);
        }

        match kind {
            VariableKind::Date => upsert(&mut self.dates, name, value.render()),
            VariableKind::Double => upsert(&mut self.doubles, name, coerce_double(kind, name, value)?),
            VariableKind::Integer => {
                let coerced = value.to_i64().ok_or_else(|| coercion_error(kind, name, value))?;
                upsert(&mut self.integers, name, coerced)
            }
            VariableKind::String => upsert(&mut self.strings, name, value.render()),
            VariableKind::ListDouble => {
                let items = match value {
                    Value::List(items) => items
                        .iter()
                        .map(|item| coerce_double(kind, name, item))
                        .collect::<Result<Vec<_>>>()?,
                    scalar => vec![coerce_double(kind, name, scalar)?],
                };
                upsert(&mut self.list_doubles, name, items)
            }
        }

        Ok(true)
    }

    /// Number of entries in the collection for `kind`
    pub fn len(&self, kind: VariableKind) -> usize {
        match kind {
            VariableKind::Date => self.dates.len(),
            VariableKind::Double => self.doubles.len(),
            VariableKind::Integer => self.integers.len(),
            VariableKind::String => self.strings.len(),
            VariableKind::ListDouble => self.list_doubles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        VariableKind::ALL.iter().all(|kind| self.len(*kind) == 0)
    }

    /// Finish into a `coRequest`, leaving empty collections out
    ///
    /// Collection keys are reserved: a scalar field written under one of
    /// them is dropped, so each key appears once in the envelope.
    pub fn into_co_request(self, mut fields: serde_json::Map<String, serde_json::Value>) -> CoRequest {
        for kind in VariableKind::ALL {
            if fields.shift_remove(kind.collection_key()).is_some() {
                tracing::debug!(
                    target_name = kind.collection_key(),
                    "dropped scalar field shadowing a variable collection"
                );
            }
        }

        CoRequest {
            fields,
            date_variables: non_empty(self.dates),
            double_variables: non_empty(self.doubles),
            integer_variables: non_empty(self.integers),
            string_variables: non_empty(self.strings),
            list_of_double_variables: non_empty(self.list_doubles),
        }
    }
}

fn upsert<T>(entries: &mut Vec<NamedValue<T>>, name: &str, value: T) {
    match entries.iter_mut().find(|entry| entry.name == name) {
        Some(entry) => entry.value = value,
        None => entries.push(NamedValue::new(name, value)),
    }
}

fn non_empty<T>(entries: Vec<T>) -> Option<Vec<T>> {
    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

fn coerce_double(kind: VariableKind, name: &str, value: &Value) -> Result<f64> {
    value
        .to_f64()
        .filter(|number| number.is_finite())
        .ok_or_else(|| coercion_error(kind, name, value))
}

fn coercion_error(kind: VariableKind, name: &str, value: &Value) -> Error {
    Error::TypeCoercion {
        target: name.to_string(),
        kind: kind.to_string(),
        value: value.to_string(),
    }
}
