//! Variable kinds.
//!
//! Every kind shares the same update lifecycle. They differ only in how an
//! interpolated template turns into a value: query variables hand it to the
//! executor, the others resolve it on the spot.

use crate::executor::QueryResult;

use super::VariableValue;

/// The closed set of variable flavors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableKind {
    /// Values come from running `query` against a data source.
    Query { query: String },

    /// A comma-separated list of options. An option may be written as
    /// `text : value` to give it a display label.
    Custom { options: String },

    /// A fixed value. Still a template, so it may reference other variables.
    Constant { value: String },
}

impl VariableKind {
    pub fn query(query: impl Into<String>) -> Self {
        Self::Query {
            query: query.into(),
        }
    }

    pub fn custom(options: impl Into<String>) -> Self {
        Self::Custom {
            options: options.into(),
        }
    }

    pub fn constant(value: impl Into<String>) -> Self {
        Self::Constant {
            value: value.into(),
        }
    }

    /// The template text whose references define dependencies.
    pub fn template(&self) -> &str {
        match self {
            Self::Query { query } => query,
            Self::Custom { options } => options,
            Self::Constant { value } => value,
        }
    }

    pub(crate) fn set_template(&mut self, template: String) {
        match self {
            Self::Query { query } => *query = template,
            Self::Custom { options } => *options = template,
            Self::Constant { value } => *value = template,
        }
    }

    /// Whether updates go through the external executor.
    pub fn runs_query(&self) -> bool {
        matches!(self, Self::Query { .. })
    }

    /// Resolve without the executor. `None` for query variables.
    ///
    /// A custom variable keeps its current selection while it is still one
    /// of the options and otherwise falls back to the first option.
    pub(crate) fn resolve_locally(
        &self,
        interpolated: &str,
        current: &VariableValue,
    ) -> Option<QueryResult> {
        match self {
            Self::Query { .. } => None,
            Self::Constant { .. } => Some(QueryResult::new(interpolated, interpolated)),
            Self::Custom { .. } => {
                let options = parse_options(interpolated);
                let offered =
                    VariableValue::Multi(options.iter().map(|(_, value)| value.clone()).collect());
                let keep = !current.is_empty()
                    && match current {
                        VariableValue::Single(value) => offered.contains(value),
                        VariableValue::Multi(values) => {
                            values.iter().all(|value| offered.contains(value))
                        }
                    };

                if keep {
                    let text = match current {
                        VariableValue::Single(value) => VariableValue::Single(label_for(&options, value)),
                        VariableValue::Multi(values) => VariableValue::Multi(
                            values.iter().map(|value| label_for(&options, value)).collect(),
                        ),
                    };
                    return Some(QueryResult {
                        value: current.clone(),
                        text,
                    });
                }

                Some(match options.first() {
                    Some((text, value)) => QueryResult::new(value.as_str(), text.as_str()),
                    None => QueryResult::default(),
                })
            }
        }
    }
}

/// Split `a, b, label : c` into `(text, value)` pairs.
fn parse_options(options: &str) -> Vec<(String, String)> {
    options
        .split(',')
        .map(str::trim)
        .filter(|option| !option.is_empty())
        .map(|option| match option.split_once(" : ") {
            Some((text, value)) => (text.trim().to_string(), value.trim().to_string()),
            None => (option.to_string(), option.to_string()),
        })
        .collect()
}

fn label_for(options: &[(String, String)], value: &str) -> String {
    options
        .iter()
        .find(|(_, v)| v == value)
        .map(|(text, _)| text.clone())
        .unwrap_or_else(|| value.to_string())
}
