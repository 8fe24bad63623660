//! Catalog source document types.
//!
//! A catalog source is a YAML file listing rule and variable definitions.
//! Parsing is strict: unknown fields and unknown variable types are rejected
//! so a typo cannot silently drop a default or a variable reference.

use crate::value::{scalar, VariableType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogDocument {
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,

    #[serde(default)]
    pub variables: Vec<VariableDefinition>,
}

/// A checkable rule. Immutable once loaded into the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Group membership, used by `unselected_groups`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Variable ids consumed by this rule, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<String>,
}

/// A typed, parameterizable value consumed by rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableDefinition {
    pub id: String,

    #[serde(rename = "type")]
    pub ty: VariableType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(
        default,
        deserialize_with = "scalar::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<String>,

    /// Named selectors: `always_prompt: 0`. A `default` key doubles as the
    /// catalog default when `default` itself is absent.
    #[serde(
        default,
        deserialize_with = "scalar::map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub options: BTreeMap<String, String>,

    /// Enumerated legal values (string and string_set only).
    #[serde(
        default,
        deserialize_with = "scalar::list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub allowed: Vec<String>,
}

/// Option key that names the default selector.
pub const DEFAULT_OPTION: &str = "default";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_normalize_to_text() {
        let yaml = r#"
variables:
  - id: var_password_pam_minlen
    type: integer
    default: 14
    options:
      default: 14
      12: 12
      "15": "15"
  - id: var_accounts_tmout
    type: duration
    default: "15m"
  - id: var_sshd_disable_compression
    type: boolean
    default: false
"#;
        let doc: CatalogDocument = serde_yaml::from_str(yaml).unwrap();
        assert!(doc.rules.is_empty());
        let minlen = &doc.variables[0];
        assert_eq!(minlen.ty, VariableType::Integer);
        assert_eq!(minlen.default.as_deref(), Some("14"));
        assert_eq!(minlen.options.get("12").map(String::as_str), Some("12"));
        assert_eq!(minlen.options.get("15").map(String::as_str), Some("15"));
        assert_eq!(doc.variables[2].default.as_deref(), Some("false"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
rules:
  - id: sshd_disable_root_login
    severity: high
"#;
        let err = serde_yaml::from_str::<CatalogDocument>(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let yaml = r#"
variables:
  - id: var_x
    type: float
"#;
        assert!(serde_yaml::from_str::<CatalogDocument>(yaml).is_err());
    }
}
