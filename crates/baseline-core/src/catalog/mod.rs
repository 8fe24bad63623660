//! Catalog index: the universe of known rules and variables.
//!
//! Built once from one or more catalog sources and read-only afterwards. The
//! index is plain owned data, so an `Arc<CatalogIndex>` can serve any number
//! of concurrent profile resolutions without locking.

pub mod loader;
pub mod schema;

pub use loader::{load, CatalogSource};
pub use schema::{CatalogDocument, RuleDefinition, VariableDefinition};

use crate::diagnostics::DiagnosticCode;
use crate::digest::canonical_digest;
use crate::value::{self, TypedValue, ValueError};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use thiserror::Error;

/// Catalog loading error. Any of these aborts resolution.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog source '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse catalog source '{source_name}': {message}")]
    Yaml {
        source_name: String,
        message: String,
    },

    #[error("Invalid catalog discovery pattern: {message}")]
    Discovery { message: String },

    #[error("{kind} '{id}' is declared differently in '{first}' and '{second}'")]
    DuplicateDefinition {
        kind: &'static str,
        id: String,
        first: String,
        second: String,
    },

    #[error("Malformed definition '{id}': {reason}")]
    MalformedDefinition { id: String, reason: String },
}

impl CatalogError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            CatalogError::Read { .. } | CatalogError::Discovery { .. } => DiagnosticCode::ReadError,
            CatalogError::DuplicateDefinition { .. } => DiagnosticCode::DuplicateDefinition,
            CatalogError::Yaml { .. } | CatalogError::MalformedDefinition { .. } => {
                DiagnosticCode::MalformedDefinition
            }
        }
    }
}

/// A value after selector expansion and type checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedValue {
    pub value: TypedValue,
    /// Selector the raw value named, if it named one.
    pub selector: Option<String>,
}

impl VariableDefinition {
    /// Catalog default, falling back to the `default` option.
    pub fn default_value(&self) -> Option<&str> {
        self.default
            .as_deref()
            .or_else(|| self.options.get(schema::DEFAULT_OPTION).map(String::as_str))
    }

    /// Expand a selector (if `raw` names one) and check the result.
    pub fn check(&self, raw: &str) -> Result<CheckedValue, ValueError> {
        let (expanded, selector) = match self.options.get(raw) {
            Some(v) => (v.as_str(), Some(raw.to_string())),
            None => (raw, None),
        };
        let value = value::check(self.ty, expanded, &self.allowed)?;
        Ok(CheckedValue { value, selector })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    rules: BTreeMap<String, RuleDefinition>,
    variables: BTreeMap<String, VariableDefinition>,
    groups: BTreeSet<String>,
    digest: String,
}

#[derive(Serialize)]
struct CanonicalCatalog<'a> {
    rules: &'a BTreeMap<String, RuleDefinition>,
    variables: &'a BTreeMap<String, VariableDefinition>,
}

impl CatalogIndex {
    /// Validate merged definitions and seal them into an index.
    pub(crate) fn build(
        rules: BTreeMap<String, RuleDefinition>,
        variables: BTreeMap<String, VariableDefinition>,
    ) -> Result<Self, CatalogError> {
        for var in variables.values() {
            validate_variable(var)?;
        }

        let mut groups = BTreeSet::new();
        for rule in rules.values() {
            if rule.id.is_empty() {
                return Err(CatalogError::MalformedDefinition {
                    id: rule.id.clone(),
                    reason: "rule id is empty".to_string(),
                });
            }
            for (i, var_id) in rule.variables.iter().enumerate() {
                if rule.variables[..i].contains(var_id) {
                    return Err(CatalogError::MalformedDefinition {
                        id: rule.id.clone(),
                        reason: format!("references variable '{}' more than once", var_id),
                    });
                }
                if !variables.contains_key(var_id) {
                    return Err(CatalogError::MalformedDefinition {
                        id: rule.id.clone(),
                        reason: format!("references unknown variable '{}'", var_id),
                    });
                }
            }
            if let Some(group) = &rule.group {
                groups.insert(group.clone());
            }
        }

        let digest = canonical_digest(&CanonicalCatalog {
            rules: &rules,
            variables: &variables,
        })
        .map_err(|e| CatalogError::MalformedDefinition {
            id: "<catalog>".to_string(),
            reason: format!("failed to canonicalize catalog: {}", e),
        })?;

        Ok(Self {
            rules,
            variables,
            groups,
            digest,
        })
    }

    pub fn rule(&self, id: &str) -> Option<&RuleDefinition> {
        self.rules.get(id)
    }

    pub fn variable(&self, id: &str) -> Option<&VariableDefinition> {
        self.variables.get(id)
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    pub fn rules_in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a RuleDefinition> {
        self.rules
            .values()
            .filter(move |r| r.group.as_deref() == Some(group))
    }

    /// Rule ids in sorted order.
    pub fn rule_ids(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Variable ids in sorted order.
    pub fn variable_ids(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// `sha256:<hex>` over the canonical JSON of all definitions.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

fn validate_variable(var: &VariableDefinition) -> Result<(), CatalogError> {
    let malformed = |reason: String| CatalogError::MalformedDefinition {
        id: var.id.clone(),
        reason,
    };

    if var.id.is_empty() {
        return Err(malformed("variable id is empty".to_string()));
    }
    if !var.allowed.is_empty()
        && !matches!(
            var.ty,
            value::VariableType::String | value::VariableType::StringSet
        )
    {
        return Err(malformed(format!(
            "'allowed' is only valid for string types, not {}",
            var.ty
        )));
    }
    if let Some(default) = var.default_value() {
        var.check(default)
            .map_err(|e| malformed(format!("default fails declared type {}: {}", var.ty, e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::VariableType;

    fn var(id: &str, ty: VariableType, default: Option<&str>) -> VariableDefinition {
        VariableDefinition {
            id: id.to_string(),
            ty,
            description: None,
            default: default.map(String::from),
            options: BTreeMap::new(),
            allowed: vec![],
        }
    }

    fn rule(id: &str, group: Option<&str>, vars: &[&str]) -> RuleDefinition {
        RuleDefinition {
            id: id.to_string(),
            title: None,
            description: None,
            group: group.map(String::from),
            variables: vars.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn index(rules: Vec<RuleDefinition>, vars: Vec<VariableDefinition>) -> Result<CatalogIndex, CatalogError> {
        CatalogIndex::build(
            rules.into_iter().map(|r| (r.id.clone(), r)).collect(),
            vars.into_iter().map(|v| (v.id.clone(), v)).collect(),
        )
    }

    #[test]
    fn test_selector_expansion() {
        let mut timeout = var("var_sudo_timestamp_timeout", VariableType::Integer, None);
        timeout.options.insert("always_prompt".into(), "0".into());
        timeout.options.insert("default".into(), "5".into());

        assert_eq!(timeout.default_value(), Some("5"));
        let checked = timeout.check("always_prompt").unwrap();
        assert_eq!(checked.value, TypedValue::Integer(0));
        assert_eq!(checked.selector.as_deref(), Some("always_prompt"));

        let literal = timeout.check("15").unwrap();
        assert_eq!(literal.value, TypedValue::Integer(15));
        assert!(literal.selector.is_none());
    }

    #[test]
    fn test_malformed_default_rejected() {
        let err = index(
            vec![],
            vec![var("var_password_pam_minlen", VariableType::Integer, Some("fourteen"))],
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::MalformedDefinition { .. }));
        assert_eq!(err.code(), DiagnosticCode::MalformedDefinition);
    }

    #[test]
    fn test_rule_referencing_unknown_variable_rejected() {
        let err = index(
            vec![rule("accounts_password_pam_minlen", None, &["var_missing"])],
            vec![],
        )
        .unwrap_err();
        assert!(err.to_string().contains("var_missing"));
    }

    #[test]
    fn test_rule_referencing_variable_twice_rejected() {
        let err = index(
            vec![rule(
                "accounts_password_pam_minlen",
                None,
                &["var_password_pam_minlen", "var_password_pam_minlen"],
            )],
            vec![var("var_password_pam_minlen", VariableType::Integer, Some("14"))],
        )
        .unwrap_err();
        assert_eq!(err.code(), DiagnosticCode::MalformedDefinition);
        assert!(err
            .to_string()
            .contains("references variable 'var_password_pam_minlen' more than once"));
    }

    #[test]
    fn test_allowed_only_for_strings() {
        let mut v = var("var_x", VariableType::Integer, None);
        v.allowed = vec!["1".into()];
        assert!(index(vec![], vec![v]).is_err());
    }

    #[test]
    fn test_groups_and_digest() {
        let idx = index(
            vec![
                rule("package_tmux_installed", Some("console_screen_locking"), &[]),
                rule("sshd_disable_root_login", Some("ssh_server"), &[]),
            ],
            vec![],
        )
        .unwrap();
        assert!(idx.has_group("ssh_server"));
        assert!(!idx.has_group("audit"));
        let in_group: Vec<_> = idx.rules_in_group("ssh_server").map(|r| r.id.as_str()).collect();
        assert_eq!(in_group, vec!["sshd_disable_root_login"]);
        assert!(idx.digest().starts_with("sha256:"));
        assert_eq!(idx.digest().len(), "sha256:".len() + 64);
    }
}
