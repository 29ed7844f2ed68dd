//! Core types for the decision request envelope
//!
//! This module defines the variable kinds of the decision service schema and
//! the request envelope the engine produces.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The typed variable collections of a decision request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariableKind {
    Date,
    Double,
    Integer,
    String,
    ListDouble,
}

impl VariableKind {
    /// All kinds in envelope order
    pub const ALL: [VariableKind; 5] = [
        VariableKind::Date,
        VariableKind::Double,
        VariableKind::Integer,
        VariableKind::String,
        VariableKind::ListDouble,
    ];

    /// Name used in mapping documents
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableKind::Date => "date",
            VariableKind::Double => "double",
            VariableKind::Integer => "integer",
            VariableKind::String => "string",
            VariableKind::ListDouble => "list_double",
        }
    }

    /// Key of the collection inside `coRequest`
    pub fn collection_key(&self) -> &'static str {
        match self {
            VariableKind::Date => "dateVariables",
            VariableKind::Double => "doubleVariables",
            VariableKind::Integer => "integerVariables",
            VariableKind::String => "stringVariables",
            VariableKind::ListDouble => "listOfDoubleVariables",
        }
    }
}

impl FromStr for VariableKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "date" => Ok(VariableKind::Date),
            "double" => Ok(VariableKind::Double),
            "integer" => Ok(VariableKind::Integer),
            "string" => Ok(VariableKind::String),
            "list_double" => Ok(VariableKind::ListDouble),
            other => Err(Error::configuration(format!(
                "Unsupported variable type '{}', expected one of: date, double, integer, string, list_double",
                other
            ))),
        }
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named entry of a typed variable collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue<T> {
    pub name: String,
    pub value: T,
}

impl<T> NamedValue<T> {
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// The `coRequest` payload: scalar fields plus the typed collections
///
/// A collection that ended up empty is `None` and does not appear in the
/// serialized envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoRequest {
    /// Scalar fields, in the order they were first written
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,

    #[serde(rename = "dateVariables", default, skip_serializing_if = "Option::is_none")]
    pub date_variables: Option<Vec<NamedValue<String>>>,

    #[serde(rename = "doubleVariables", default, skip_serializing_if = "Option::is_none")]
    pub double_variables: Option<Vec<NamedValue<f64>>>,

    #[serde(rename = "integerVariables", default, skip_serializing_if = "Option::is_none")]
    pub integer_variables: Option<Vec<NamedValue<i64>>>,

    #[serde(rename = "stringVariables", default, skip_serializing_if = "Option::is_none")]
    pub string_variables: Option<Vec<NamedValue<String>>>,

    #[serde(
        rename = "listOfDoubleVariables",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub list_of_double_variables: Option<Vec<NamedValue<Vec<f64>>>>,
}

impl CoRequest {
    /// Whether the collection for `kind` is present in the envelope
    pub fn has_collection(&self, kind: VariableKind) -> bool {
        self.collection_len(kind) > 0
    }

    /// Number of entries in the collection for `kind`
    pub fn collection_len(&self, kind: VariableKind) -> usize {
        match kind {
            VariableKind::Date => self.date_variables.as_ref().map_or(0, Vec::len),
            VariableKind::Double => self.double_variables.as_ref().map_or(0, Vec::len),
            VariableKind::Integer => self.integer_variables.as_ref().map_or(0, Vec::len),
            VariableKind::String => self.string_variables.as_ref().map_or(0, Vec::len),
            VariableKind::ListDouble => {
                self.list_of_double_variables.as_ref().map_or(0, Vec::len)
            }
        }
    }
}

fn find<'a, T>(entries: &'a Option<Vec<NamedValue<T>>>, name: &str) -> Option<&'a T> {
    entries
        .as_ref()?
        .iter()
        .find(|entry| entry.name == name)
        .map(|entry| &entry.value)
}

/// A decision request envelope ready for the decision service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// Identifier correlating the request with a decision instance
    #[serde(rename = "__DecisionID__")]
    pub decision_id: String,

    /// Scalar and typed-variable payload
    #[serde(rename = "coRequest")]
    pub co_request: CoRequest,
}

impl DecisionRequest {
    pub fn new(decision_id: impl Into<String>, co_request: CoRequest) -> Self {
        Self {
            decision_id: decision_id.into(),
            co_request,
        }
    }

    pub fn decision_id(&self) -> &str {
        &self.decision_id
    }

    /// The value of a scalar field
    pub fn scalar(&self, name: &str) -> Option<&serde_json::Value> {
        self.co_request.fields.get(name)
    }

    pub fn date_variable(&self, name: &str) -> Option<&str> {
        find(&self.co_request.date_variables, name).map(String::as_str)
    }

    pub fn double_variable(&self, name: &str) -> Option<f64> {
        find(&self.co_request.double_variables, name).copied()
    }

    pub fn integer_variable(&self, name: &str) -> Option<i64> {
        find(&self.co_request.integer_variables, name).copied()
    }

    pub fn string_variable(&self, name: &str) -> Option<&str> {
        find(&self.co_request.string_variables, name).map(String::as_str)
    }

    pub fn list_double_variable(&self, name: &str) -> Option<&[f64]> {
        find(&self.co_request.list_of_double_variables, name).map(Vec::as_slice)
    }

    /// Convert the envelope into a JSON value
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Read an envelope back from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
