//! Resolution pipeline: extend, select, bind, emit.
//!
//! Stages share no mutable state. The catalog and the profile arena are
//! immutable once built and held behind `Arc`, so one `Resolver` (or clones
//! of it) can serve concurrent resolutions from any number of threads.

use crate::catalog::{CatalogError, CatalogIndex, CatalogSource};
use crate::config::{BuildConfig, ConfigError};
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::extend::{self, ExtensionError};
use crate::plan::{self, BuildPlan};
use crate::profile::{ParseError, Profile, ProfileArena};
use crate::similarity::closest_id;
use crate::{bind, select};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, info_span};

/// Fatal resolution error; no plan is produced.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Extension(#[from] ExtensionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Unknown profile '{id}'")]
    UnknownProfile {
        id: String,
        suggestion: Option<String>,
    },
}

impl ResolveError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            ResolveError::Catalog(e) => e.code(),
            ResolveError::Parse(e) => e.code(),
            ResolveError::Extension(e) => e.code(),
            ResolveError::Config(e) => e.code(),
            ResolveError::UnknownProfile { .. } => DiagnosticCode::UnknownProfile,
        }
    }

    /// Render as a diagnostic so fatal errors print like accumulated ones.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let (id, suggestion) = match self {
            ResolveError::Catalog(CatalogError::DuplicateDefinition { id, .. })
            | ResolveError::Catalog(CatalogError::MalformedDefinition { id, .. }) => (id.clone(), None),
            ResolveError::Catalog(CatalogError::Read { path, .. }) => (path.display().to_string(), None),
            ResolveError::Catalog(CatalogError::Yaml { source_name, .. }) => (source_name.clone(), None),
            ResolveError::Catalog(CatalogError::Discovery { .. }) => (String::new(), None),
            ResolveError::Parse(ParseError::Read { path, .. }) => (path.display().to_string(), None),
            ResolveError::Parse(ParseError::Schema { profile, .. })
            | ResolveError::Parse(ParseError::DuplicateSelection { profile, .. })
            | ResolveError::Parse(ParseError::DuplicateOverride { profile, .. }) => {
                (profile.clone(), None)
            }
            ResolveError::Extension(ExtensionError::Cycle { cycle }) => {
                (cycle.first().cloned().unwrap_or_default(), None)
            }
            ResolveError::Extension(ExtensionError::UnknownParent {
                parent, suggestion, ..
            }) => (parent.clone(), suggestion.clone()),
            ResolveError::Config(_) => (String::new(), None),
            ResolveError::UnknownProfile { id, suggestion } => (id.clone(), suggestion.clone()),
        };
        Diagnostic::new(self.code(), id, self.to_string()).with_suggestion(suggestion)
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    catalog: Arc<CatalogIndex>,
    profiles: Arc<ProfileArena>,
    product: Option<String>,
}

impl Resolver {
    pub fn new(catalog: Arc<CatalogIndex>, profiles: Arc<ProfileArena>) -> Self {
        Self {
            catalog,
            profiles,
            product: None,
        }
    }

    /// Load catalog and profiles named by a build configuration.
    pub fn from_config(config: &BuildConfig) -> Result<Self, ResolveError> {
        Self::load(&config.catalog_sources(), &config.profiles)
            .map(|r| r.with_product(config.product.clone()))
    }

    pub fn load(
        sources: &[CatalogSource],
        profiles_dir: &std::path::Path,
    ) -> Result<Self, ResolveError> {
        let catalog = crate::catalog::load(sources)?;
        let profiles = ProfileArena::load_dir(profiles_dir)?;
        info!(
            profiles = profiles.len(),
            dir = %profiles_dir.display(),
            "loaded profiles"
        );
        Ok(Self::new(Arc::new(catalog), Arc::new(profiles)))
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    pub fn profiles(&self) -> &ProfileArena {
        &self.profiles
    }

    /// Resolve a profile of the arena by id.
    pub fn resolve(&self, profile_id: &str) -> Result<BuildPlan, ResolveError> {
        let profile = self
            .profiles
            .get(profile_id)
            .ok_or_else(|| ResolveError::UnknownProfile {
                id: profile_id.to_string(),
                suggestion: closest_id(profile_id, self.profiles.ids()),
            })?;
        self.resolve_profile(profile)
    }

    /// Resolve a profile that may not live in the arena; its `extends` chain
    /// is still looked up there.
    pub fn resolve_profile(&self, profile: &Profile) -> Result<BuildPlan, ResolveError> {
        let span = info_span!("resolve", profile = %profile.id);
        let _guard = span.enter();

        let flattened = extend::resolve(profile, &self.profiles)?;
        let selection = select::resolve(&flattened, &self.catalog);
        let mut bindings = bind::bind(
            &flattened.id,
            &selection.rules,
            &selection.assignments,
            &selection.overrides,
            &self.catalog,
        );

        let mut diagnostics = selection.diagnostics;
        diagnostics.extend(std::mem::take(&mut bindings.diagnostics));

        let plan = plan::emit(
            &flattened.id,
            self.product.as_deref(),
            &selection.rules,
            &bindings,
            diagnostics,
            &self.catalog,
        );

        info!(
            rules = plan.summary.rules,
            bound = plan.summary.bound_variables,
            errors = plan.summary.errors,
            warnings = plan.summary.warnings,
            "resolved profile"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::parse;

    fn resolver() -> Resolver {
        let catalog = crate::catalog::load(&[CatalogSource::Inline {
            name: "test".into(),
            content: r#"
rules:
  - id: sshd_disable_root_login
  - id: accounts_password_pam_minlen
    variables: [var_password_pam_minlen]
variables:
  - id: var_password_pam_minlen
    type: integer
    default: 14
"#
            .into(),
        }])
        .unwrap();

        let mut arena = ProfileArena::new();
        arena.insert(
            parse(
                "ospp",
                "title: OSPP\ndescription: d\ndocumentation_complete: true\nselections: [sshd_disable_root_login]\n",
            )
            .unwrap(),
        );
        Resolver::new(Arc::new(catalog), Arc::new(arena)).with_product("rhel9")
    }

    #[test]
    fn test_resolve_by_id() {
        let plan = resolver().resolve("ospp").unwrap();
        assert_eq!(plan.profile, "ospp");
        assert_eq!(plan.product.as_deref(), Some("rhel9"));
        assert_eq!(plan.rule_ids().collect::<Vec<_>>(), vec!["sshd_disable_root_login"]);
    }

    #[test]
    fn test_unknown_profile_suggests() {
        let err = resolver().resolve("osp").unwrap_err();
        assert_eq!(err.code(), DiagnosticCode::UnknownProfile);
        let d = err.to_diagnostic();
        assert_eq!(d.id, "osp");
        assert_eq!(d.suggestion.as_deref(), Some("ospp"));
    }

    #[test]
    fn test_resolve_profile_outside_arena() {
        let child = parse(
            "local",
            "title: t\ndescription: d\ndocumentation_complete: false\nextends: ospp\nselections: [accounts_password_pam_minlen]\n",
        )
        .unwrap();
        let plan = resolver().resolve_profile(&child).unwrap();
        assert_eq!(
            plan.rule_ids().collect::<Vec<_>>(),
            vec!["sshd_disable_root_login", "accounts_password_pam_minlen"]
        );
        assert!(plan.is_build_ready());
    }

    #[test]
    fn test_extension_error_is_fatal() {
        let child = parse(
            "local",
            "title: t\ndescription: d\ndocumentation_complete: false\nextends: missing\nselections: []\n",
        )
        .unwrap();
        let err = resolver().resolve_profile(&child).unwrap_err();
        assert!(matches!(err, ResolveError::Extension(_)));
        assert_eq!(err.code(), DiagnosticCode::UnknownProfile);
    }
}
