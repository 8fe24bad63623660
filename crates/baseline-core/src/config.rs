//! `baseline.yaml` build configuration.

use crate::catalog::CatalogSource;
use crate::diagnostics::DiagnosticCode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "baseline.yaml";

#[derive(Debug, Error)]
#[error("ConfigError: {0}")]
pub struct ConfigError(pub String);

impl ConfigError {
    pub fn code(&self) -> DiagnosticCode {
        DiagnosticCode::ConfigError
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    pub version: u32,
    pub product: String,
    /// Catalog files or directories.
    pub catalog: Vec<PathBuf>,
    /// Directory holding `*.profile` documents.
    pub profiles: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub deny_warnings: bool,
}

impl BuildConfig {
    pub fn catalog_sources(&self) -> Vec<CatalogSource> {
        self.catalog.iter().cloned().map(CatalogSource::from_path).collect()
    }

    /// Anchor relative paths at `base`.
    fn resolve_paths(&mut self, base: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.catalog.iter_mut().for_each(anchor);
        anchor(&mut self.profiles);
        if let Some(output) = self.output.as_mut() {
            anchor(output);
        }
    }
}

pub fn load_config(path: &Path) -> Result<BuildConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    let mut cfg = parse_config(&raw)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    cfg.resolve_paths(base);
    Ok(cfg)
}

/// Parse and validate config text. Paths are left as written.
pub fn parse_config(raw: &str) -> Result<BuildConfig, ConfigError> {
    let cfg: BuildConfig = serde_yaml::from_str(raw)
        .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;
    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }
    if cfg.product.trim().is_empty() {
        return Err(ConfigError("config has an empty product".into()));
    }
    if cfg.catalog.is_empty() {
        return Err(ConfigError("config lists no catalog sources".into()));
    }
    Ok(cfg)
}
