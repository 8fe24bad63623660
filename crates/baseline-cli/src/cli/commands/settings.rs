//! Effective settings: command-line flags layered over `baseline.yaml`.

use crate::cli::args::SourceArgs;
use baseline_core::{load_config, BuildConfig, CatalogSource, ConfigError, ResolveError, Resolver};
use std::path::PathBuf;

pub(crate) struct Settings {
    pub sources: Vec<CatalogSource>,
    pub profiles_dir: PathBuf,
    pub product: Option<String>,
    pub output: Option<PathBuf>,
    pub deny_warnings: bool,
}

impl Settings {
    /// The config file is optional when flags name everything the command
    /// reads: the profiles directory, plus the catalog if `needs_catalog`.
    pub fn from_args(args: &SourceArgs, needs_catalog: bool) -> Result<Self, ConfigError> {
        let flags_complete =
            (!needs_catalog || !args.catalog.is_empty()) && args.profiles_dir.is_some();
        let config: Option<BuildConfig> = if !flags_complete || args.config.exists() {
            Some(load_config(&args.config)?)
        } else {
            None
        };

        let sources = if args.catalog.is_empty() {
            config
                .as_ref()
                .map(BuildConfig::catalog_sources)
                .unwrap_or_default()
        } else {
            args.catalog
                .iter()
                .cloned()
                .map(CatalogSource::from_path)
                .collect()
        };

        let profiles_dir = args
            .profiles_dir
            .clone()
            .or_else(|| config.as_ref().map(|c| c.profiles.clone()))
            .ok_or_else(|| ConfigError("no profiles directory configured".into()))?;

        Ok(Self {
            sources,
            profiles_dir,
            product: config.as_ref().map(|c| c.product.clone()),
            output: config.as_ref().and_then(|c| c.output.clone()),
            deny_warnings: config.as_ref().is_some_and(|c| c.deny_warnings),
        })
    }

    pub fn resolver(&self) -> Result<Resolver, ResolveError> {
        let resolver = Resolver::load(&self.sources, &self.profiles_dir)?;
        Ok(match &self.product {
            Some(product) => resolver.with_product(product.clone()),
            None => resolver,
        })
    }
}
