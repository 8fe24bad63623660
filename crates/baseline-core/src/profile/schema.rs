//! Profile document as written on disk.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Raw profile document.
///
/// `selections` mixes bare rule ids, `!rule_id` unselections and
/// `variable=value` assignments; the parser splits them once into typed
/// entries so later stages never re-parse strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileDocument {
    pub title: String,

    pub description: String,

    #[serde(default)]
    pub extends: Option<String>,

    pub documentation_complete: bool,

    pub selections: Vec<String>,

    #[serde(default)]
    pub unselected_groups: Vec<String>,

    /// Explicit `variable=value` overrides. A list, so duplicates stay visible.
    #[serde(default)]
    pub overrides: Vec<String>,

    /// Passed through unvalidated.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_yaml::Value>,

    /// Passed through unvalidated.
    #[serde(default)]
    pub reference: Option<String>,
}
