//! Variable binding.
//!
//! Precedence, highest wins: explicit override, inline assignment, catalog
//! default. Only variables consumed by a selected rule are bound.

use crate::catalog::CatalogIndex;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::profile::OverrideEntry;
use crate::select::Assignment;
use crate::similarity::closest_id;
use crate::value::TypedValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Where a bound value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    CatalogDefault,
    ProfileSelection,
    ExplicitOverride,
    /// Assignment or override declared by an ancestor profile.
    ParentInherited,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Provenance::CatalogDefault => "catalog-default",
            Provenance::ProfileSelection => "profile-selection",
            Provenance::ExplicitOverride => "explicit-override",
            Provenance::ParentInherited => "parent-inherited",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundValue {
    pub variable: String,
    /// Normalised text of `typed`.
    pub value: String,
    pub typed: TypedValue,
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherited_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Catalog default as written, before selector expansion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Named selectors offered by the catalog, sorted by selector.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Alternative>,
}

/// One catalog option: `always_prompt` -> `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub selector: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct Bindings {
    pub values: BTreeMap<String, BoundValue>,
    pub diagnostics: Diagnostics,
}

impl Bindings {
    pub fn get(&self, variable: &str) -> Option<&BoundValue> {
        self.values.get(variable)
    }
}

struct Candidate<'a> {
    raw: &'a str,
    provenance: Provenance,
    declared_in: Option<&'a str>,
}

/// Bind every variable consumed by `rules`.
///
/// `profile` is the id of the profile being resolved; values declared by any
/// other profile in its ancestry are marked [`Provenance::ParentInherited`].
pub fn bind(
    profile: &str,
    rules: &[String],
    assignments: &[Assignment],
    overrides: &[OverrideEntry],
    catalog: &CatalogIndex,
) -> Bindings {
    let mut out = Bindings::default();

    let assigned: HashMap<&str, &Assignment> = assignments
        .iter()
        .map(|a| (a.variable.as_str(), a))
        .collect();
    let overridden: HashMap<&str, &OverrideEntry> = overrides
        .iter()
        .map(|o| (o.variable.as_str(), o))
        .collect();

    // Variables in first-touch order, with the rules consuming them.
    let mut touched: Vec<&str> = Vec::new();
    let mut consumers: HashMap<&str, Vec<&str>> = HashMap::new();
    for rule_id in rules {
        let Some(rule) = catalog.rule(rule_id) else {
            continue;
        };
        for var in &rule.variables {
            let entry = consumers.entry(var.as_str()).or_default();
            if entry.is_empty() {
                touched.push(var.as_str());
            }
            entry.push(rule_id.as_str());
        }
    }

    for var_id in &touched {
        let Some(def) = catalog.variable(var_id) else {
            continue;
        };

        let candidate = if let Some(o) = overridden.get(var_id) {
            Candidate {
                raw: &o.value,
                provenance: Provenance::ExplicitOverride,
                declared_in: Some(o.declared_in.as_str()),
            }
        } else if let Some(a) = assigned.get(var_id) {
            Candidate {
                raw: &a.value,
                provenance: Provenance::ProfileSelection,
                declared_in: Some(a.declared_in.as_str()),
            }
        } else if let Some(default) = def.default_value() {
            Candidate {
                raw: default,
                provenance: Provenance::CatalogDefault,
                declared_in: None,
            }
        } else {
            let rules = consumers.get(var_id).map(|r| r.join(", ")).unwrap_or_default();
            out.diagnostics.push(Diagnostic::new(
                DiagnosticCode::UnboundVariable,
                *var_id,
                format!("no override, assignment or default; consumed by {}", rules),
            ));
            continue;
        };

        let inherited_from = candidate
            .declared_in
            .filter(|d| *d != profile)
            .map(str::to_string);
        let provenance = if inherited_from.is_some() {
            Provenance::ParentInherited
        } else {
            candidate.provenance
        };

        match def.check(candidate.raw) {
            Ok(checked) => {
                debug!(variable = %var_id, %provenance, "bound variable");
                out.values.insert(
                    var_id.to_string(),
                    BoundValue {
                        variable: var_id.to_string(),
                        value: checked.value.normalized(),
                        typed: checked.value,
                        provenance,
                        selector: checked.selector,
                        inherited_from,
                        description: def.description.clone(),
                        default: def.default_value().map(str::to_string),
                        alternatives: def
                            .options
                            .iter()
                            .map(|(selector, value)| Alternative {
                                selector: selector.clone(),
                                value: value.clone(),
                            })
                            .collect(),
                    },
                );
            }
            Err(e) => out.diagnostics.push(Diagnostic::new(
                DiagnosticCode::TypeMismatch,
                *var_id,
                format!(
                    "value '{}' ({}) does not fit declared type {}: {}",
                    candidate.raw, provenance, def.ty, e
                ),
            )),
        }
    }

    for a in assignments {
        check_unconsumed(
            &mut out.diagnostics,
            catalog,
            &consumers,
            (a.variable.as_str(), a.value.as_str(), a.declared_in.as_str()),
            Provenance::ProfileSelection,
        );
    }
    for o in overrides {
        check_unconsumed(
            &mut out.diagnostics,
            catalog,
            &consumers,
            (o.variable.as_str(), o.value.as_str(), o.declared_in.as_str()),
            Provenance::ExplicitOverride,
        );
    }

    debug!(
        profile,
        bound = out.values.len(),
        diagnostics = out.diagnostics.len(),
        "bound variables"
    );
    out
}

/// Diagnose an assignment or override for a variable no selected rule
/// consumes. Its value is still type-checked.
fn check_unconsumed(
    diagnostics: &mut Diagnostics,
    catalog: &CatalogIndex,
    consumers: &HashMap<&str, Vec<&str>>,
    (variable, value, declared_in): (&str, &str, &str),
    kind: Provenance,
) {
    let (unused, what) = match kind {
        Provenance::ExplicitOverride => (DiagnosticCode::UnusedOverride, "override"),
        _ => (DiagnosticCode::UnusedAssignment, "assignment"),
    };

    let Some(def) = catalog.variable(variable) else {
        diagnostics.push(
            Diagnostic::new(
                DiagnosticCode::UnknownVariable,
                variable,
                format!("{} names a variable not defined in the catalog", what),
            )
            .with_suggestion(closest_id(variable, catalog.variable_ids())),
        );
        return;
    };
    if consumers.contains_key(variable) {
        return;
    }

    diagnostics.push(Diagnostic::new(
        unused,
        variable,
        format!(
            "{} '{}={}' (declared in '{}') is not consumed by any selected rule",
            what, variable, value, declared_in
        ),
    ));
    if let Err(e) = def.check(value) {
        diagnostics.push(Diagnostic::new(
            DiagnosticCode::TypeMismatch,
            variable,
            format!(
                "value '{}' ({}) does not fit declared type {}: {}",
                value, kind, def.ty, e
            ),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, CatalogSource};

    const CATALOG: &str = r#"
rules:
  - id: accounts_password_pam_minlen
    variables: [var_password_pam_minlen]
  - id: sudo_require_reauthentication
    variables: [var_sudo_timestamp_timeout]
  - id: sshd_set_keepalive
    variables: [var_sshd_set_keepalive]
  - id: sshd_rekey_limit
    variables: [var_rekey_limit_size]
variables:
  - id: var_password_pam_minlen
    type: integer
    default: 14
  - id: var_sudo_timestamp_timeout
    type: integer
    options:
      always_prompt: 0
      default: 5
  - id: var_sshd_set_keepalive
    type: integer
  - id: var_rekey_limit_size
    type: size
    default: 512M
"#;

    fn catalog() -> CatalogIndex {
        catalog::load(&[CatalogSource::Inline {
            name: "test".into(),
            content: CATALOG.into(),
        }])
        .unwrap()
    }

    fn assign(variable: &str, value: &str, declared_in: &str) -> Assignment {
        Assignment {
            variable: variable.into(),
            value: value.into(),
            declared_in: declared_in.into(),
        }
    }

    fn over(variable: &str, value: &str, declared_in: &str) -> OverrideEntry {
        OverrideEntry {
            variable: variable.into(),
            value: value.into(),
            declared_in: declared_in.into(),
        }
    }

    fn rules(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_override_beats_assignment_beats_default() {
        let cat = catalog();
        let rules = rules(&["accounts_password_pam_minlen"]);

        let b = bind("p", &rules, &[], &[], &cat);
        let v = b.get("var_password_pam_minlen").unwrap();
        assert_eq!((v.value.as_str(), v.provenance), ("14", Provenance::CatalogDefault));

        let assignments = [assign("var_password_pam_minlen", "12", "p")];
        let b = bind("p", &rules, &assignments, &[], &cat);
        let v = b.get("var_password_pam_minlen").unwrap();
        assert_eq!((v.value.as_str(), v.provenance), ("12", Provenance::ProfileSelection));

        let overrides = [over("var_password_pam_minlen", "15", "p")];
        let b = bind("p", &rules, &assignments, &overrides, &cat);
        let v = b.get("var_password_pam_minlen").unwrap();
        assert_eq!((v.value.as_str(), v.provenance), ("15", Provenance::ExplicitOverride));
        assert!(b.diagnostics.is_empty());
    }

    #[test]
    fn test_selector_and_options_default() {
        let cat = catalog();
        let rules = rules(&["sudo_require_reauthentication"]);

        let b = bind("p", &rules, &[], &[], &cat);
        assert_eq!(b.get("var_sudo_timestamp_timeout").unwrap().value, "5");

        let overrides = [over("var_sudo_timestamp_timeout", "always_prompt", "p")];
        let b = bind("p", &rules, &[], &overrides, &cat);
        let v = b.get("var_sudo_timestamp_timeout").unwrap();
        assert_eq!(v.value, "0");
        assert_eq!(v.typed, TypedValue::Integer(0));
        assert_eq!(v.selector.as_deref(), Some("always_prompt"));
    }

    #[test]
    fn test_inherited_provenance() {
        let cat = catalog();
        let assignments = [assign("var_password_pam_minlen", "12", "ospp")];
        let b = bind("stig", &rules(&["accounts_password_pam_minlen"]), &assignments, &[], &cat);
        let v = b.get("var_password_pam_minlen").unwrap();
        assert_eq!(v.provenance, Provenance::ParentInherited);
        assert_eq!(v.inherited_from.as_deref(), Some("ospp"));
    }

    #[test]
    fn test_unbound_variable_warns_once() {
        let cat = catalog();
        let b = bind("p", &rules(&["sshd_set_keepalive"]), &[], &[], &cat);
        assert!(b.get("var_sshd_set_keepalive").is_none());
        let unbound: Vec<_> = b.diagnostics.with_code(DiagnosticCode::UnboundVariable).collect();
        assert_eq!(unbound.len(), 1);
        assert!(unbound[0].message.contains("sshd_set_keepalive"));
        assert!(!b.diagnostics.has_errors());
    }

    #[test]
    fn test_type_mismatch_is_not_bound() {
        let cat = catalog();
        let overrides = [over("var_password_pam_minlen", "fourteen", "p")];
        let b = bind("p", &rules(&["accounts_password_pam_minlen"]), &[], &overrides, &cat);
        assert!(b.get("var_password_pam_minlen").is_none());
        let d = b.diagnostics.with_code(DiagnosticCode::TypeMismatch).next().unwrap();
        assert_eq!(d.id, "var_password_pam_minlen");
        assert!(d.message.contains("fourteen"));
        assert!(d.message.contains("integer"));
    }

    #[test]
    fn test_unused_and_unknown_overrides() {
        let cat = catalog();
        let overrides = [
            over("var_rekey_limit_size", "1G", "p"),
            over("var_no_such_thing", "1", "p"),
        ];
        let b = bind("p", &rules(&["accounts_password_pam_minlen"]), &[], &overrides, &cat);
        assert_eq!(b.diagnostics.with_code(DiagnosticCode::UnusedOverride).count(), 1);
        assert_eq!(b.diagnostics.with_code(DiagnosticCode::UnknownVariable).count(), 1);
        assert!(b.get("var_rekey_limit_size").is_none());
    }

    #[test]
    fn test_unconsumed_assignment_is_reported_and_checked() {
        let cat = catalog();
        let assignments = [
            assign("var_rekey_limit_size", "notasize", "p"),
            assign("var_sshd_set_keepalive", "3", "p"),
        ];
        let b = bind("p", &rules(&["accounts_password_pam_minlen"]), &assignments, &[], &cat);

        let unused: Vec<_> = b.diagnostics.with_code(DiagnosticCode::UnusedAssignment).collect();
        assert_eq!(unused.len(), 2);
        assert_eq!(unused[0].id, "var_rekey_limit_size");
        assert!(unused[0].message.contains("var_rekey_limit_size=notasize"));

        let mismatch: Vec<_> = b.diagnostics.with_code(DiagnosticCode::TypeMismatch).collect();
        assert_eq!(mismatch.len(), 1);
        assert_eq!(mismatch[0].id, "var_rekey_limit_size");
        assert!(b.diagnostics.has_errors());
    }

    #[test]
    fn test_unknown_assignment_passed_directly() {
        let cat = catalog();
        let assignments = [assign("var_password_pam_minle", "12", "p")];
        let b = bind("p", &rules(&["accounts_password_pam_minlen"]), &assignments, &[], &cat);
        let d = b.diagnostics.with_code(DiagnosticCode::UnknownVariable).next().unwrap();
        assert_eq!(d.suggestion.as_deref(), Some("var_password_pam_minlen"));
        assert_eq!(b.diagnostics.len(), 1);
    }

    #[test]
    fn test_bound_value_carries_catalog_context() {
        let cat = catalog();
        let b = bind("p", &rules(&["sudo_require_reauthentication"]), &[], &[], &cat);
        let v = b.get("var_sudo_timestamp_timeout").unwrap();
        assert_eq!(v.default.as_deref(), Some("5"));
        let selectors: Vec<_> = v.alternatives.iter().map(|a| a.selector.as_str()).collect();
        assert_eq!(selectors, vec!["always_prompt", "default"]);
        assert_eq!(v.alternatives[0].value, "0");
    }

    #[test]
    fn test_size_normalised_to_bytes() {
        let cat = catalog();
        let b = bind("p", &rules(&["sshd_rekey_limit"]), &[], &[], &cat);
        assert_eq!(b.get("var_rekey_limit_size").unwrap().value, "536870912");
    }
}
