//! Diagnostics produced while resolving a profile.
//!
//! Fatal errors abort resolution and are reported through their `code()`;
//! everything discovered during selection resolution and variable binding is
//! accumulated here so a single run surfaces the full set.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Fixed diagnostic taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    SchemaError,
    DuplicateSelection,
    DuplicateOverride,
    ExtensionCycle,
    UnknownProfile,
    UnknownRule,
    UnknownVariable,
    UnknownGroup,
    RedundantSelection,
    TypeMismatch,
    UnboundVariable,
    UnusedOverride,
    UnusedAssignment,
    DuplicateDefinition,
    MalformedDefinition,
    ReadError,
    ConfigError,
}

impl DiagnosticCode {
    /// Severity is a property of the code, never chosen at the call site.
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticCode::UnboundVariable
            | DiagnosticCode::UnusedOverride
            | DiagnosticCode::UnusedAssignment
            | DiagnosticCode::UnknownGroup
            | DiagnosticCode::RedundantSelection => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::SchemaError => "SchemaError",
            DiagnosticCode::DuplicateSelection => "DuplicateSelection",
            DiagnosticCode::DuplicateOverride => "DuplicateOverride",
            DiagnosticCode::ExtensionCycle => "ExtensionCycle",
            DiagnosticCode::UnknownProfile => "UnknownProfile",
            DiagnosticCode::UnknownRule => "UnknownRule",
            DiagnosticCode::UnknownVariable => "UnknownVariable",
            DiagnosticCode::UnknownGroup => "UnknownGroup",
            DiagnosticCode::RedundantSelection => "RedundantSelection",
            DiagnosticCode::TypeMismatch => "TypeMismatch",
            DiagnosticCode::UnboundVariable => "UnboundVariable",
            DiagnosticCode::UnusedOverride => "UnusedOverride",
            DiagnosticCode::UnusedAssignment => "UnusedAssignment",
            DiagnosticCode::DuplicateDefinition => "DuplicateDefinition",
            DiagnosticCode::MalformedDefinition => "MalformedDefinition",
            DiagnosticCode::ReadError => "ReadError",
            DiagnosticCode::ConfigError => "ConfigError",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    /// Offending rule, variable, group or profile id.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: code.severity(),
            code,
            message: message.into(),
            id: id.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: Option<String>) -> Self {
        self.suggestion = suggestion;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn format_terminal(&self) -> String {
        let mut s = format!("{}[{}] {}: {}", self.severity, self.code, self.id, self.message);
        if let Some(suggestion) = &self.suggestion {
            s.push_str(&format!(" (did you mean '{}'?)", suggestion));
        }
        s
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_terminal())
    }
}

/// Ordered diagnostic accumulator. Keeps discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(
            code = %diagnostic.code,
            id = %diagnostic.id,
            severity = %diagnostic.severity,
            "diagnostic"
        );
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> usize {
        self.0.iter().filter(|d| d.is_error()).count()
    }

    pub fn warnings(&self) -> usize {
        self.0.len() - self.errors()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn has_at_or_above(&self, threshold: Severity) -> bool {
        self.0.iter().any(|d| d.severity >= threshold)
    }

    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(move |d| d.code == code)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(v: Vec<Diagnostic>) -> Self {
        Self(v)
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
