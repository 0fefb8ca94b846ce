//! Core value types shared by schemas, resources and data sources
//!
//! Configuration and state are flat maps from attribute name to `Dynamic`,
//! a JSON-like value. Nested blocks are represented as lists of maps, the
//! same shape the declarative surface uses.

use std::collections::HashMap;

/// Dynamic represents a configuration or state value of any type
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Number value (all numbers are f64)
    Number(f64),
    /// String value
    String(String),
    /// List of values (ordered, allows duplicates)
    List(Vec<Dynamic>),
    /// Map of string keys to values
    Map(HashMap<String, Dynamic>),
}

impl Dynamic {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|n| n as i64)
    }

    pub fn as_list(&self) -> Option<&[Dynamic]> {
        match self {
            Dynamic::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Dynamic>> {
        match self {
            Dynamic::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Convert a JSON value into a Dynamic, used when flattening API
    /// responses into state
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Dynamic::Null,
            serde_json::Value::Bool(b) => Dynamic::Bool(b),
            serde_json::Value::Number(n) => Dynamic::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Dynamic::String(s),
            serde_json::Value::Array(items) => {
                Dynamic::List(items.into_iter().map(Dynamic::from_json).collect())
            }
            serde_json::Value::Object(entries) => Dynamic::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Dynamic::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Inverse of [`Dynamic::from_json`], used when expanding state back
    /// into request bodies
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Dynamic::Null => serde_json::Value::Null,
            Dynamic::Bool(b) => serde_json::Value::Bool(*b),
            Dynamic::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Dynamic::String(s) => serde_json::Value::String(s.clone()),
            Dynamic::List(items) => {
                serde_json::Value::Array(items.iter().map(Dynamic::to_json).collect())
            }
            Dynamic::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
        }
    }
}

/// Config represents the declared configuration values of a resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub values: HashMap<String, Dynamic>,
}

/// State represents the stored state values of a resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    pub values: HashMap<String, Dynamic>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a required string attribute, with a readable error when it is
    /// missing or of the wrong type
    pub fn require_string(&self, name: &str) -> crate::Result<&str> {
        match self.values.get(name) {
            Some(Dynamic::String(s)) => Ok(s),
            Some(other) => Err(crate::ProviderError::TypeMismatch {
                expected: "string".to_string(),
                actual: other.type_name().to_string(),
            }),
            None => Err(format!("{} is required", name).into()),
        }
    }
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_string(&self, name: &str) -> crate::Result<&str> {
        match self.values.get(name) {
            Some(Dynamic::String(s)) => Ok(s),
            Some(other) => Err(crate::ProviderError::TypeMismatch {
                expected: "string".to_string(),
                actual: other.type_name().to_string(),
            }),
            None => Err(format!("{} is required in state", name).into()),
        }
    }
}

/// Diagnostic represents a single warning or error raised by an operation
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub summary: String,
    pub detail: Option<String>,
}

/// Diagnostics collects warnings and errors for one operation
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, summary: impl Into<String>, detail: Option<impl Into<String>>) {
        self.errors.push(Diagnostic {
            summary: summary.into(),
            detail: detail.map(Into::into),
        });
    }

    pub fn add_warning(&mut self, summary: impl Into<String>, detail: Option<impl Into<String>>) {
        self.warnings.push(Diagnostic {
            summary: summary.into(),
            detail: detail.map(Into::into),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}
