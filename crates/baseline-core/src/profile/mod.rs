//! Profiles: named rule selections plus variable overrides.

pub mod arena;
pub mod parser;
pub mod schema;

pub use arena::{load_file, ProfileArena};
pub use parser::parse;
pub use schema::ProfileDocument;

use crate::diagnostics::DiagnosticCode;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// One entry of a profile's selection sequence.
///
/// `declared_in` names the profile whose document contained the entry; after
/// extension merging it is how inherited entries are told apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEntry {
    /// Bare rule id: enables the rule.
    Rule { id: String, declared_in: String },
    /// `!rule_id`: removes an inherited selection of the rule.
    Unselect { id: String, declared_in: String },
    /// `variable=value`: binds the variable inline.
    Assign {
        variable: String,
        value: String,
        declared_in: String,
    },
}

impl SelectionEntry {
    /// Rule or variable id the entry refers to.
    pub fn id(&self) -> &str {
        match self {
            SelectionEntry::Rule { id, .. } | SelectionEntry::Unselect { id, .. } => id,
            SelectionEntry::Assign { variable, .. } => variable,
        }
    }

    pub fn declared_in(&self) -> &str {
        match self {
            SelectionEntry::Rule { declared_in, .. }
            | SelectionEntry::Unselect { declared_in, .. }
            | SelectionEntry::Assign { declared_in, .. } => declared_in,
        }
    }
}

impl std::fmt::Display for SelectionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionEntry::Rule { id, .. } => write!(f, "{}", id),
            SelectionEntry::Unselect { id, .. } => write!(f, "!{}", id),
            SelectionEntry::Assign {
                variable, value, ..
            } => write!(f, "{}={}", variable, value),
        }
    }
}

/// Explicit `variable=value` override, given outside the selection sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideEntry {
    pub variable: String,
    pub value: String,
    pub declared_in: String,
}

/// A parsed profile. Immutable; extension produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: String,
    pub title: String,
    pub description: String,
    pub extends: Option<String>,
    pub selections: Vec<SelectionEntry>,
    pub overrides: Vec<OverrideEntry>,
    pub unselected_groups: Vec<String>,
    pub documentation_complete: bool,
    pub metadata: BTreeMap<String, serde_yaml::Value>,
    pub reference: Option<String>,
}

impl Profile {
    /// An empty profile, the identity element of extension merging.
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            description: String::new(),
            extends: None,
            selections: Vec::new(),
            overrides: Vec::new(),
            unselected_groups: Vec::new(),
            documentation_complete: false,
            metadata: BTreeMap::new(),
            reference: None,
        }
    }
}

/// Profile parse error. Aborts resolution.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read profile '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Profile '{profile}' is malformed: {message}")]
    Schema { profile: String, message: String },

    #[error("Profile '{profile}' selects '{id}' more than once")]
    DuplicateSelection { profile: String, id: String },

    #[error("Profile '{profile}' overrides '{id}' more than once")]
    DuplicateOverride { profile: String, id: String },
}

impl ParseError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            ParseError::Read { .. } => DiagnosticCode::ReadError,
            ParseError::Schema { .. } => DiagnosticCode::SchemaError,
            ParseError::DuplicateSelection { .. } => DiagnosticCode::DuplicateSelection,
            ParseError::DuplicateOverride { .. } => DiagnosticCode::DuplicateOverride,
        }
    }
}
