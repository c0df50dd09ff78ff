//! Interpolation.
//!
//! Replaces every reference in a template with the current value of the
//! referenced variable. Lookups go through [`ValueLookup`] so the caller
//! decides which variables are visible; there is no global registry.

use std::collections::HashMap;

use super::{segments, Segment};
use crate::variable::VariableValue;

/// Result of looking up a referenced name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// Not a variable of this set. The reference is left verbatim.
    Unknown,

    /// A variable that has never resolved. Interpolates as the empty string.
    Unresolved,

    /// The variable's current value.
    Value(&'a VariableValue),
}

/// Source of variable values for interpolation.
pub trait ValueLookup {
    fn resolve(&self, name: &str) -> Resolution<'_>;
}

impl ValueLookup for HashMap<String, VariableValue> {
    fn resolve(&self, name: &str) -> Resolution<'_> {
        match self.get(name) {
            Some(value) => Resolution::Value(value),
            None => Resolution::Unknown,
        }
    }
}

/// Substitute references in `template` with values from `lookup`.
///
/// `separator` joins multi-valued variables referenced without a format.
pub fn interpolate<L>(template: &str, lookup: &L, separator: &str) -> String
where
    L: ValueLookup + ?Sized,
{
    let mut out = String::with_capacity(template.len());
    for segment in segments(template) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Reference(reference) => match lookup.resolve(reference.name) {
                Resolution::Unknown => out.push_str(reference.raw),
                Resolution::Unresolved => {}
                Resolution::Value(value) => {
                    out.push_str(&render_value(value, reference.format, separator))
                }
            },
        }
    }
    out
}

/// Render a value for substitution using an optional format.
///
/// Formats only affect multi-valued variables: `csv` joins with commas,
/// `pipe` with `|`, `regex` produces an alternation group. Anything else
/// joins with `separator`.
pub fn render_value(value: &VariableValue, format: Option<&str>, separator: &str) -> String {
    match value {
        VariableValue::Single(value) => value.clone(),
        VariableValue::Multi(values) => match format {
            Some("csv") => values.join(","),
            Some("pipe") => values.join("|"),
            Some("regex") => format!("({})", values.join("|")),
            _ => values.join(separator),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, VariableValue)]) -> HashMap<String, VariableValue> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn substitutes_single_values() {
        let lookup = values(&[("job", "api".into()), ("env", "prod".into())]);
        assert_eq!(
            interpolate("up{job=\"$job\", env=\"${env}\"}", &lookup, ","),
            "up{job=\"api\", env=\"prod\"}"
        );
    }

    #[test]
    fn unknown_references_pass_through() {
        let lookup = values(&[("a", "1".into())]);
        assert_eq!(
            interpolate("rate(x[$__interval]) * $a", &lookup, ","),
            "rate(x[$__interval]) * 1"
        );
    }

    #[test]
    fn multi_values_use_format() {
        let lookup = values(&[("host", VariableValue::from(vec!["a", "b"]))]);
        assert_eq!(interpolate("${host:csv}", &lookup, " "), "a,b");
        assert_eq!(interpolate("${host:pipe}", &lookup, " "), "a|b");
        assert_eq!(interpolate("${host:regex}", &lookup, " "), "(a|b)");
        assert_eq!(interpolate("$host", &lookup, " OR "), "a OR b");
    }

    #[test]
    fn unresolved_reference_is_empty() {
        struct NothingResolved;
        impl ValueLookup for NothingResolved {
            fn resolve(&self, _name: &str) -> Resolution<'_> {
                Resolution::Unresolved
            }
        }
        assert_eq!(interpolate("[$a]-[${b}]", &NothingResolved, ","), "[]-[]");
    }
}
