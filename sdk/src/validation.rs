//! Validation rules attached to field definitions
//!
//! A rule is a `{name, value}` pair where the value is already serialized
//! the way the remote expects it: plain strings for scalar bounds, JSON
//! arrays for list-shaped payloads. Typed field builders decide which
//! constructors are reachable for which field type.

use serde::{Deserialize, Serialize};

/// One named constraint on a field, in wire form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub name: String,
    pub value: String,
}

impl ValidationRule {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn min(value: impl Into<String>) -> Self {
        Self::new("min", value)
    }

    pub fn max(value: impl Into<String>) -> Self {
        Self::new("max", value)
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::new("regex", pattern)
    }

    pub fn max_precision(digits: u32) -> Self {
        Self::new("max_precision", digits.to_string())
    }

    pub fn choices<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("choices", json_array(choices))
    }

    pub fn allowed_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("allowed_domains", json_array(domains))
    }

    pub fn file_types<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("file_type_options", json_array(kinds))
    }

    /// References a declared entity type. The value here is the local type
    /// alias; reconciliation swaps it for the prefixed type string and the
    /// apply step swaps that for the remote definition id before mutating.
    pub fn entity_definition(entity_type: impl Into<String>) -> Self {
        Self::new("entity_definition_id", entity_type)
    }
}

/// Stability-sort by rule name, the canonical order for comparisons
pub fn sorted(rules: &[ValidationRule]) -> Vec<ValidationRule> {
    let mut out = rules.to_vec();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

fn json_array<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let items: Vec<String> = items.into_iter().map(Into::into).collect();
    serde_json::to_string(&items).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_payloads_serialize_as_json_arrays() {
        assert_eq!(
            ValidationRule::choices(["red", "blue"]).value,
            r#"["red","blue"]"#
        );
        assert_eq!(
            ValidationRule::allowed_domains(["example.com"]).value,
            r#"["example.com"]"#
        );
        assert_eq!(
            ValidationRule::file_types(["Image", "Video"]).name,
            "file_type_options"
        );
    }

    #[test]
    fn test_sorted_orders_by_name() {
        let rules = vec![
            ValidationRule::regex("^a"),
            ValidationRule::max("10"),
            ValidationRule::min("1"),
        ];
        let sorted_rules = sorted(&rules);
        let names: Vec<&str> = sorted_rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["max", "min", "regex"]);
    }
}
