//! Profile resolution and compilation for compliance baselines.
//!
//! A profile selects rules from a catalog and binds the variables those rules
//! consume. Resolution runs as a strict pipeline over immutable values:
//!
//! - parse the profile document ([`profile::parse`])
//! - flatten its `extends` chain ([`extend::resolve`])
//! - cross-reference selections with the catalog ([`select::resolve`])
//! - bind variables by precedence ([`bind::bind`])
//! - assemble a [`BuildPlan`] ([`plan::emit`])
//!
//! # Quick Start
//!
//! ```no_run
//! use baseline_core::{load_config, Resolver};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), baseline_core::ResolveError> {
//! let config = load_config(Path::new("baseline.yaml"))?;
//! let resolver = Resolver::from_config(&config)?;
//! let plan = resolver.resolve("ospp")?;
//! if !plan.is_build_ready() {
//!     for d in &plan.diagnostics {
//!         eprintln!("{}", d);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod bind;
pub mod catalog;
pub mod config;
pub mod diagnostics;
mod digest;
pub mod extend;
pub mod pipeline;
pub mod plan;
pub mod profile;
pub mod select;
pub mod similarity;
pub mod value;

// Convenience re-exports
pub use bind::{Alternative, BoundValue, Provenance};
pub use catalog::{CatalogError, CatalogIndex, CatalogSource};
pub use config::{load_config, BuildConfig, ConfigError};
pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use extend::ExtensionError;
pub use pipeline::{ResolveError, Resolver};
pub use plan::{BuildPlan, PlanSummary, ResolvedRule};
pub use profile::{ParseError, Profile, ProfileArena};
pub use value::{TypedValue, VariableType};
