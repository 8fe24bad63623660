//! Profile parsing.
//!
//! Decodes the YAML document strictly (unknown fields are a schema error),
//! then splits the flat selection list into typed entries exactly once.

use super::schema::ProfileDocument;
use super::{OverrideEntry, ParseError, Profile, SelectionEntry};
use std::collections::HashSet;

/// Prefix marking an explicit unselection in a selection list.
pub const UNSELECT_MARKER: char = '!';

/// Parse a profile document. `id` is the profile's identity in its arena.
pub fn parse(id: &str, document: &str) -> Result<Profile, ParseError> {
    let doc: ProfileDocument =
        serde_yaml::from_str(document).map_err(|e| ParseError::Schema {
            profile: id.to_string(),
            message: format_yaml_error(e),
        })?;
    from_document(id, doc)
}

/// Build a profile from an already-decoded document.
pub fn from_document(id: &str, doc: ProfileDocument) -> Result<Profile, ParseError> {
    let schema = |message: String| ParseError::Schema {
        profile: id.to_string(),
        message,
    };

    if let Some(parent) = &doc.extends {
        if parent.trim().is_empty() {
            return Err(schema("'extends' is empty".to_string()));
        }
    }

    let mut seen_rules = HashSet::new();
    let mut seen_unselects = HashSet::new();
    let mut seen_assigns = HashSet::new();
    let mut selections = Vec::with_capacity(doc.selections.len());

    for raw in &doc.selections {
        let entry = parse_selection(id, raw).map_err(schema)?;
        let fresh = match &entry {
            SelectionEntry::Rule { id: rule, .. } => seen_rules.insert(rule.clone()),
            SelectionEntry::Unselect { id: rule, .. } => seen_unselects.insert(rule.clone()),
            SelectionEntry::Assign { variable, .. } => seen_assigns.insert(variable.clone()),
        };
        if !fresh {
            return Err(ParseError::DuplicateSelection {
                profile: id.to_string(),
                id: entry.id().to_string(),
            });
        }
        selections.push(entry);
    }

    let mut seen_overrides = HashSet::new();
    let mut overrides = Vec::with_capacity(doc.overrides.len());
    for raw in &doc.overrides {
        let (variable, value) = split_assignment(raw)
            .ok_or_else(|| schema(format!("override '{}' is not of the form name=value", raw)))?;
        if !seen_overrides.insert(variable.to_string()) {
            return Err(ParseError::DuplicateOverride {
                profile: id.to_string(),
                id: variable.to_string(),
            });
        }
        overrides.push(OverrideEntry {
            variable: variable.to_string(),
            value: value.to_string(),
            declared_in: id.to_string(),
        });
    }

    let mut unselected_groups: Vec<String> = Vec::with_capacity(doc.unselected_groups.len());
    for group in doc.unselected_groups {
        let group = group.trim().to_string();
        if group.is_empty() {
            return Err(schema("empty entry in 'unselected_groups'".to_string()));
        }
        if !unselected_groups.contains(&group) {
            unselected_groups.push(group);
        }
    }

    Ok(Profile {
        id: id.to_string(),
        title: doc.title,
        description: doc.description,
        extends: doc.extends.map(|p| p.trim().to_string()),
        selections,
        overrides,
        unselected_groups,
        documentation_complete: doc.documentation_complete,
        metadata: doc.metadata,
        reference: doc.reference,
    })
}

fn parse_selection(profile: &str, raw: &str) -> Result<SelectionEntry, String> {
    let entry = raw.trim();
    if entry.is_empty() {
        return Err("empty selection entry".to_string());
    }

    if let Some(rule) = entry.strip_prefix(UNSELECT_MARKER) {
        let rule = rule.trim();
        if rule.is_empty() || rule.contains('=') {
            return Err(format!("invalid unselection '{}'", raw));
        }
        return Ok(SelectionEntry::Unselect {
            id: rule.to_string(),
            declared_in: profile.to_string(),
        });
    }

    if entry.contains('=') {
        let (variable, value) =
            split_assignment(raw).ok_or_else(|| format!("invalid assignment '{}'", raw))?;
        return Ok(SelectionEntry::Assign {
            variable: variable.to_string(),
            value: value.to_string(),
            declared_in: profile.to_string(),
        });
    }

    Ok(SelectionEntry::Rule {
        id: entry.to_string(),
        declared_in: profile.to_string(),
    })
}

/// Split on the first `=`. The name is trimmed and must be non-empty; the
/// value is kept verbatim and may be empty.
fn split_assignment(raw: &str) -> Option<(&str, &str)> {
    let (name, value) = raw.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value))
}

fn format_yaml_error(e: serde_yaml::Error) -> String {
    let msg = e.to_string();

    if msg.contains("missing field") {
        return format!("Required field missing: {}", msg);
    }
    if msg.contains("unknown field") {
        return format!("Unknown field detected: {}", msg);
    }

    msg
}
