//! Variable values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The current value (or display text) of a variable.
///
/// Multi-select variables hold several values at once; how they are joined
/// is decided at interpolation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Single(String),
    Multi(Vec<String>),
}

impl VariableValue {
    /// True for the empty single value and for an empty selection.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(value) => value.is_empty(),
            Self::Multi(values) => values.is_empty(),
        }
    }

    /// Whether `candidate` is this value or one of the selected values.
    pub fn contains(&self, candidate: &str) -> bool {
        match self {
            Self::Single(value) => value == candidate,
            Self::Multi(values) => values.iter().any(|v| v == candidate),
        }
    }
}

impl Default for VariableValue {
    fn default() -> Self {
        Self::Single(String::new())
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(value) => f.write_str(value),
            Self::Multi(values) => write!(f, "{}", values.join(",")),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for VariableValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

impl From<Vec<&str>> for VariableValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multi(values.into_iter().map(str::to_string).collect())
    }
}
