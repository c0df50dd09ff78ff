//! Variable set configuration.
//!
//! Every option has a default, so an empty JSON object is a valid
//! configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What to do with `${name}` references to names that are not in the set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownReferencePolicy {
    /// Leave them alone. They are passed through to the query verbatim.
    #[default]
    Ignore,

    /// Log a warning for each one when the dependency graph is built.
    Warn,
}

/// Configuration for a [`VariableSet`](crate::scheduler::VariableSet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetConfig {
    /// Re-query variables that are already resolved when the set is
    /// activated.
    ///
    /// When `false`, activating a fully resolved set issues no queries.
    ///
    /// Default: false
    #[serde(default)]
    pub refresh_on_activate: bool,

    /// Handling of references to names outside the set.
    ///
    /// Default: ignore
    #[serde(default)]
    pub unknown_references: UnknownReferencePolicy,

    /// Separator used when a multi-valued variable is interpolated without
    /// an explicit format.
    ///
    /// Default: ","
    #[serde(default = "default_multi_value_separator")]
    pub multi_value_separator: String,
}

fn default_multi_value_separator() -> String {
    ",".to_string()
}

impl Default for SetConfig {
    fn default() -> Self {
        Self {
            refresh_on_activate: false,
            unknown_references: UnknownReferencePolicy::default(),
            multi_value_separator: default_multi_value_separator(),
        }
    }
}

impl SetConfig {
    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builder-style toggle for [`SetConfig::refresh_on_activate`].
    pub fn with_refresh_on_activate(mut self, refresh: bool) -> Self {
        self.refresh_on_activate = refresh;
        self
    }

    /// Builder-style setter for [`SetConfig::unknown_references`].
    pub fn with_unknown_references(mut self, policy: UnknownReferencePolicy) -> Self {
        self.unknown_references = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchedulerError;

    #[test]
    fn empty_object_uses_defaults() {
        let config = SetConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SetConfig::default());
        assert_eq!(config.multi_value_separator, ",");
    }

    #[test]
    fn fields_parse_from_json() {
        let config = SetConfig::from_json_str(
            r#"{"refresh_on_activate": true, "unknown_references": "warn", "multi_value_separator": " OR "}"#,
        )
        .unwrap();
        assert!(config.refresh_on_activate);
        assert_eq!(config.unknown_references, UnknownReferencePolicy::Warn);
        assert_eq!(config.multi_value_separator, " OR ");
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let err = SetConfig::from_json_str(r#"{"unknown_references": "shout"}"#).unwrap_err();
        assert!(matches!(err, SchedulerError::Config(_)));
    }
}
