//! Build plan: the resolved, typed output of a profile resolution.
//!
//! Only vectors appear in the serialized form, so the JSON is stable and
//! diffable run to run.

use crate::bind::{Bindings, BoundValue};
use crate::catalog::CatalogIndex;
use crate::diagnostics::Diagnostics;
use crate::digest::canonical_digest;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRule {
    pub id: String,
    /// Ordinal id, `rule_set_00`, `rule_set_01`, ...
    pub rule_set: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Bound values in the rule's declared variable order.
    #[serde(default)]
    pub variables: Vec<BoundValue>,
}

impl ResolvedRule {
    pub fn variable(&self, id: &str) -> Option<&BoundValue> {
        self.variables.iter().find(|v| v.variable == id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub rules: usize,
    pub bound_variables: usize,
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub profile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    pub catalog_digest: String,
    pub rules: Vec<ResolvedRule>,
    pub diagnostics: Diagnostics,
    pub summary: PlanSummary,
}

impl BuildPlan {
    /// False when any error-severity diagnostic is present.
    pub fn is_build_ready(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    pub fn rule(&self, id: &str) -> Option<&ResolvedRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.id.as_str())
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// `sha256:<hex>` over the canonical JSON of the plan.
    pub fn digest(&self) -> serde_json::Result<String> {
        canonical_digest(self)
    }
}

/// Assemble the plan. No validation happens here.
pub fn emit(
    profile: &str,
    product: Option<&str>,
    rules: &[String],
    bindings: &Bindings,
    diagnostics: Diagnostics,
    catalog: &CatalogIndex,
) -> BuildPlan {
    let width = rule_set_width(rules.len());
    let resolved: Vec<ResolvedRule> = rules
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let def = catalog.rule(id);
            let variables = def
                .map(|d| {
                    d.variables
                        .iter()
                        .filter_map(|v| bindings.get(v).cloned())
                        .collect()
                })
                .unwrap_or_default();
            ResolvedRule {
                id: id.clone(),
                rule_set: format!("rule_set_{:0width$}", i, width = width),
                title: def.and_then(|d| d.title.clone()),
                description: def.and_then(|d| d.description.clone()),
                group: def.and_then(|d| d.group.clone()),
                variables,
            }
        })
        .collect();

    let summary = PlanSummary {
        rules: resolved.len(),
        bound_variables: bindings.values.len(),
        errors: diagnostics.errors(),
        warnings: diagnostics.warnings(),
    };

    BuildPlan {
        profile: profile.to_string(),
        product: product.map(str::to_string),
        catalog_digest: catalog.digest().to_string(),
        rules: resolved,
        diagnostics,
        summary,
    }
}

/// Digits needed for the largest ordinal, at least two.
fn rule_set_width(count: usize) -> usize {
    let largest = count.saturating_sub(1);
    largest.to_string().len().max(2)
}
