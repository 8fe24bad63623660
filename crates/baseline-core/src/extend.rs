//! Extension resolution: flattening `extends` chains.
//!
//! Parents are resolved first (post-order), then merged with the child into a
//! new profile. Merge rules, child wins on every conflict:
//!
//! 1. Inherited rule selections named by a child `!rule` unselection are
//!    dropped; unselection is applied before the child's additions.
//! 2. A variable the child binds (inline or by override) drops every
//!    inherited binding of that variable, of either kind.
//! 3. Remaining inherited entries come first, then the child's own entries,
//!    each keeping its original relative order.
//! 4. `unselected_groups` is the ordered union, parent first.
//!
//! Entries keep `declared_in`, so provenance of inherited values survives.

use crate::diagnostics::DiagnosticCode;
use crate::profile::{Profile, ProfileArena, SelectionEntry};
use crate::similarity::closest_id;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("Profile extension cycle: {}", .cycle.join(" -> "))]
    Cycle { cycle: Vec<String> },

    #[error("Profile '{profile}' extends unknown profile '{parent}'")]
    UnknownParent {
        profile: String,
        parent: String,
        suggestion: Option<String>,
    },
}

impl ExtensionError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            ExtensionError::Cycle { .. } => DiagnosticCode::ExtensionCycle,
            ExtensionError::UnknownParent { .. } => DiagnosticCode::UnknownProfile,
        }
    }
}

/// Flatten `profile` against its ancestry in `arena`.
///
/// A profile without `extends` is returned unchanged. The result never has
/// `extends` set.
pub fn resolve(profile: &Profile, arena: &ProfileArena) -> Result<Profile, ExtensionError> {
    let mut path = Vec::new();
    resolve_on_path(profile, arena, &mut path)
}

fn resolve_on_path(
    profile: &Profile,
    arena: &ProfileArena,
    path: &mut Vec<String>,
) -> Result<Profile, ExtensionError> {
    if let Some(start) = path.iter().position(|p| *p == profile.id) {
        let mut cycle = path[start..].to_vec();
        cycle.push(profile.id.clone());
        return Err(ExtensionError::Cycle { cycle });
    }

    let Some(parent_id) = profile.extends.as_deref() else {
        return Ok(profile.clone());
    };

    let parent = arena
        .get(parent_id)
        .ok_or_else(|| ExtensionError::UnknownParent {
            profile: profile.id.clone(),
            parent: parent_id.to_string(),
            suggestion: closest_id(parent_id, arena.ids()),
        })?;

    path.push(profile.id.clone());
    let flattened_parent = resolve_on_path(parent, arena, path)?;
    path.pop();

    debug!(profile = %profile.id, parent = %parent_id, "merging parent profile");
    Ok(merge(&flattened_parent, profile))
}

/// Merge an already-flattened parent with a child. Pure; neither input changes.
pub fn merge(parent: &Profile, child: &Profile) -> Profile {
    let unselected: HashSet<&str> = child
        .selections
        .iter()
        .filter_map(|e| match e {
            SelectionEntry::Unselect { id, .. } => Some(id.as_str()),
            _ => None,
        })
        .collect();

    let rebound: HashSet<&str> = child
        .selections
        .iter()
        .filter_map(|e| match e {
            SelectionEntry::Assign { variable, .. } => Some(variable.as_str()),
            _ => None,
        })
        .chain(child.overrides.iter().map(|o| o.variable.as_str()))
        .collect();

    let mut selections: Vec<SelectionEntry> = parent
        .selections
        .iter()
        .filter(|e| match e {
            SelectionEntry::Rule { id, .. } => !unselected.contains(id.as_str()),
            SelectionEntry::Assign { variable, .. } => !rebound.contains(variable.as_str()),
            SelectionEntry::Unselect { .. } => true,
        })
        .cloned()
        .collect();
    selections.extend(child.selections.iter().cloned());

    let mut overrides: Vec<_> = parent
        .overrides
        .iter()
        .filter(|o| !rebound.contains(o.variable.as_str()))
        .cloned()
        .collect();
    overrides.extend(child.overrides.iter().cloned());

    let mut unselected_groups = parent.unselected_groups.clone();
    for group in &child.unselected_groups {
        if !unselected_groups.contains(group) {
            unselected_groups.push(group.clone());
        }
    }

    Profile {
        id: child.id.clone(),
        title: child.title.clone(),
        description: child.description.clone(),
        extends: None,
        selections,
        overrides,
        unselected_groups,
        documentation_complete: child.documentation_complete,
        metadata: child.metadata.clone(),
        reference: child.reference.clone(),
    }
}
