//! Selection resolution: cross-reference a flattened profile with the catalog.
//!
//! Every problem is accumulated as a diagnostic; nothing here aborts. Each
//! unknown id is reported exactly once, however many entries mention it.

use crate::catalog::CatalogIndex;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::profile::{OverrideEntry, Profile, SelectionEntry};
use crate::similarity::closest_id;
use std::collections::HashSet;
use tracing::debug;

/// Inline `variable=value` taken from the selection sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub variable: String,
    pub value: String,
    pub declared_in: String,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionOutcome {
    /// Working rule set, in first-occurrence order.
    pub rules: Vec<String>,
    /// Pseudo-assignments naming known variables.
    pub assignments: Vec<Assignment>,
    /// Overrides naming known variables.
    pub overrides: Vec<OverrideEntry>,
    pub diagnostics: Diagnostics,
}

/// Resolve the selections and overrides of a flattened profile.
///
/// `!rule` unselections were applied during extension merging; here they are
/// only checked to name a known rule.
pub fn resolve(profile: &Profile, catalog: &CatalogIndex) -> SelectionOutcome {
    let mut out = SelectionOutcome::default();
    let mut reported: HashSet<String> = HashSet::new();
    let mut selected: HashSet<&str> = HashSet::new();
    let mut redundant: HashSet<&str> = HashSet::new();

    for entry in &profile.selections {
        match entry {
            SelectionEntry::Rule { id, .. } => {
                if catalog.rule(id).is_none() {
                    report_unknown_rule(&mut out.diagnostics, &mut reported, id, catalog);
                    continue;
                }
                if !selected.insert(id.as_str()) {
                    if redundant.insert(id.as_str()) {
                        out.diagnostics.push(Diagnostic::new(
                            DiagnosticCode::RedundantSelection,
                            id.as_str(),
                            format!("rule is selected more than once (again in '{}')", entry.declared_in()),
                        ));
                    }
                    continue;
                }
                out.rules.push(id.clone());
            }
            SelectionEntry::Unselect { id, .. } => {
                if catalog.rule(id).is_none() {
                    report_unknown_rule(&mut out.diagnostics, &mut reported, id, catalog);
                }
            }
            SelectionEntry::Assign {
                variable,
                value,
                declared_in,
            } => {
                if catalog.variable(variable).is_none() {
                    report_unknown_variable(&mut out.diagnostics, &mut reported, variable, catalog);
                    continue;
                }
                out.assignments.push(Assignment {
                    variable: variable.clone(),
                    value: value.clone(),
                    declared_in: declared_in.clone(),
                });
            }
        }
    }

    for o in &profile.overrides {
        if catalog.variable(&o.variable).is_none() {
            report_unknown_variable(&mut out.diagnostics, &mut reported, &o.variable, catalog);
            continue;
        }
        out.overrides.push(o.clone());
    }

    apply_unselected_groups(profile, catalog, &mut out);

    debug!(
        profile = %profile.id,
        rules = out.rules.len(),
        assignments = out.assignments.len(),
        overrides = out.overrides.len(),
        "resolved selections"
    );
    out
}

fn apply_unselected_groups(profile: &Profile, catalog: &CatalogIndex, out: &mut SelectionOutcome) {
    let mut groups: HashSet<&str> = HashSet::new();
    for group in &profile.unselected_groups {
        if catalog.has_group(group) {
            groups.insert(group.as_str());
        } else {
            out.diagnostics.push(Diagnostic::new(
                DiagnosticCode::UnknownGroup,
                group.as_str(),
                "unselected group is not defined by any catalog rule",
            ));
        }
    }
    if groups.is_empty() {
        return;
    }

    out.rules.retain(|id| {
        let group = catalog.rule(id).and_then(|r| r.group.as_deref());
        let keep = !group.is_some_and(|g| groups.contains(g));
        if !keep {
            debug!(rule = %id, "rule removed by unselected group");
        }
        keep
    });
}

fn report_unknown_rule(
    diagnostics: &mut Diagnostics,
    reported: &mut HashSet<String>,
    id: &str,
    catalog: &CatalogIndex,
) {
    if reported.insert(id.to_string()) {
        diagnostics.push(
            Diagnostic::new(DiagnosticCode::UnknownRule, id, "rule is not defined in the catalog")
                .with_suggestion(closest_id(id, catalog.rule_ids())),
        );
    }
}

fn report_unknown_variable(
    diagnostics: &mut Diagnostics,
    reported: &mut HashSet<String>,
    id: &str,
    catalog: &CatalogIndex,
) {
    if reported.insert(id.to_string()) {
        diagnostics.push(
            Diagnostic::new(
                DiagnosticCode::UnknownVariable,
                id,
                "variable is not defined in the catalog",
            )
            .with_suggestion(closest_id(id, catalog.variable_ids())),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, CatalogSource};
    use crate::profile::parse;

    fn catalog() -> CatalogIndex {
        catalog::load(&[CatalogSource::Inline {
            name: "test".into(),
            content: r#"
rules:
  - id: sshd_disable_root_login
    group: ssh_server
  - id: sshd_set_idle_timeout
    group: ssh_server
    variables: [var_sshd_set_keepalive]
  - id: package_tmux_installed
    group: console_screen_locking
variables:
  - id: var_sshd_set_keepalive
    type: integer
    default: 0
"#
            .into(),
        }])
        .unwrap()
    }

    fn profile(body: &str) -> Profile {
        parse(
            "test",
            &format!("title: t\ndescription: d\ndocumentation_complete: true\n{}", body),
        )
        .unwrap()
    }

    #[test]
    fn test_splits_rules_and_assignments() {
        let p = profile(
            "selections: [sshd_set_idle_timeout, var_sshd_set_keepalive=1, package_tmux_installed]\n",
        );
        let out = resolve(&p, &catalog());
        assert_eq!(out.rules, vec!["sshd_set_idle_timeout", "package_tmux_installed"]);
        assert_eq!(out.assignments.len(), 1);
        assert_eq!(out.assignments[0].value, "1");
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_ids_reported_once() {
        let p = profile(
            "selections: [totally_bogus_rule, '!totally_bogus_rule', var_nope=1, sshd_disable_root_login]\noverrides: [var_nope=2]\n",
        );
        let out = resolve(&p, &catalog());
        assert_eq!(out.rules, vec!["sshd_disable_root_login"]);
        assert_eq!(out.diagnostics.with_code(DiagnosticCode::UnknownRule).count(), 1);
        assert_eq!(out.diagnostics.with_code(DiagnosticCode::UnknownVariable).count(), 1);
        assert!(out.overrides.is_empty());
    }

    #[test]
    fn test_unknown_rule_suggestion() {
        let p = profile("selections: [sshd_disable_rot_login]\n");
        let out = resolve(&p, &catalog());
        let d = out.diagnostics.iter().next().unwrap();
        assert_eq!(d.suggestion.as_deref(), Some("sshd_disable_root_login"));
    }

    #[test]
    fn test_redundant_selection_warns_once() {
        let mut p = profile("selections: [package_tmux_installed]\n");
        let again = p.selections[0].clone();
        p.selections.push(again.clone());
        p.selections.push(again);

        let out = resolve(&p, &catalog());
        assert_eq!(out.rules, vec!["package_tmux_installed"]);
        let warnings: Vec<_> = out
            .diagnostics
            .with_code(DiagnosticCode::RedundantSelection)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(!out.diagnostics.has_errors());
    }

    #[test]
    fn test_unselected_groups() {
        let p = profile(
            "selections: [sshd_disable_root_login, package_tmux_installed, sshd_set_idle_timeout]\nunselected_groups: [ssh_server, no_such_group]\n",
        );
        let out = resolve(&p, &catalog());
        assert_eq!(out.rules, vec!["package_tmux_installed"]);
        let unknown: Vec<_> = out.diagnostics.with_code(DiagnosticCode::UnknownGroup).collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].id, "no_such_group");
        assert!(!out.diagnostics.has_errors());
    }
}
