//! Catalog loader.
//!
//! Sources are expanded to concrete documents (directories are walked for
//! `*.yml`/`*.yaml`), parsed concurrently, then merged in source order so the
//! resulting index never depends on thread scheduling.

use super::schema::CatalogDocument;
use super::{CatalogError, CatalogIndex, RuleDefinition, VariableDefinition};
use globset::{Glob, GlobMatcher};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Where catalog definitions come from.
#[derive(Debug, Clone)]
pub enum CatalogSource {
    /// A single YAML document.
    File(PathBuf),
    /// A directory searched recursively for YAML documents.
    Dir(PathBuf),
    /// In-memory content, e.g. embedded at compile time.
    Inline { name: String, content: String },
}

impl CatalogSource {
    /// File or directory, decided by what exists on disk.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            CatalogSource::Dir(path)
        } else {
            CatalogSource::File(path)
        }
    }
}

impl std::fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogSource::File(path) => write!(f, "file:{}", path.display()),
            CatalogSource::Dir(path) => write!(f, "dir:{}", path.display()),
            CatalogSource::Inline { name, .. } => write!(f, "inline:{}", name),
        }
    }
}

/// One parseable document after directory expansion.
enum Unit<'a> {
    Path(PathBuf),
    Inline { name: &'a str, content: &'a str },
}

impl Unit<'_> {
    fn name(&self) -> String {
        match self {
            Unit::Path(path) => path.display().to_string(),
            Unit::Inline { name, .. } => (*name).to_string(),
        }
    }
}

/// Load and index every source.
pub fn load(sources: &[CatalogSource]) -> Result<CatalogIndex, CatalogError> {
    let units = expand_sources(sources)?;
    debug!(documents = units.len(), "parsing catalog documents");

    let parsed = parse_concurrently(&units);

    let mut rules: BTreeMap<String, RuleDefinition> = BTreeMap::new();
    let mut variables: BTreeMap<String, VariableDefinition> = BTreeMap::new();
    let mut rule_origin: HashMap<String, String> = HashMap::new();
    let mut var_origin: HashMap<String, String> = HashMap::new();

    for result in parsed {
        let (name, doc) = result?;
        for rule in doc.rules {
            merge_definition(&mut rules, &mut rule_origin, "rule", &rule.id.clone(), rule, &name)?;
        }
        for var in doc.variables {
            merge_definition(
                &mut variables,
                &mut var_origin,
                "variable",
                &var.id.clone(),
                var,
                &name,
            )?;
        }
    }

    let index = CatalogIndex::build(rules, variables)?;
    info!(
        rules = index.rule_count(),
        variables = index.variable_count(),
        digest = %index.digest(),
        "loaded catalog"
    );
    Ok(index)
}

fn merge_definition<T: PartialEq>(
    into: &mut BTreeMap<String, T>,
    origins: &mut HashMap<String, String>,
    kind: &'static str,
    id: &str,
    definition: T,
    source_name: &str,
) -> Result<(), CatalogError> {
    match into.get(id) {
        Some(existing) if *existing == definition => {
            debug!(kind, id, source = source_name, "identical redeclaration");
            Ok(())
        }
        Some(_) => Err(CatalogError::DuplicateDefinition {
            kind,
            id: id.to_string(),
            first: origins.get(id).cloned().unwrap_or_default(),
            second: source_name.to_string(),
        }),
        None => {
            into.insert(id.to_string(), definition);
            origins.insert(id.to_string(), source_name.to_string());
            Ok(())
        }
    }
}

fn expand_sources(sources: &[CatalogSource]) -> Result<Vec<Unit<'_>>, CatalogError> {
    let matcher = yaml_matcher()?;
    let mut units = Vec::new();
    for source in sources {
        match source {
            CatalogSource::File(path) => units.push(Unit::Path(path.clone())),
            CatalogSource::Dir(dir) => {
                let mut found = Vec::new();
                walk_dir(dir, &matcher, &mut found)?;
                found.sort();
                debug!(dir = %dir.display(), documents = found.len(), "discovered catalog documents");
                units.extend(found.into_iter().map(Unit::Path));
            }
            CatalogSource::Inline { name, content } => units.push(Unit::Inline {
                name: name.as_str(),
                content: content.as_str(),
            }),
        }
    }
    Ok(units)
}

fn yaml_matcher() -> Result<GlobMatcher, CatalogError> {
    Glob::new("*.{yml,yaml}")
        .map(|g| g.compile_matcher())
        .map_err(|e| CatalogError::Discovery {
            message: e.to_string(),
        })
}

fn walk_dir(dir: &Path, matcher: &GlobMatcher, out: &mut Vec<PathBuf>) -> Result<(), CatalogError> {
    let read_err = |source| CatalogError::Read {
        path: dir.to_path_buf(),
        source,
    };
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_dir() {
            walk_dir(&path, matcher, out)?;
        } else if path.file_name().is_some_and(|n| matcher.is_match(n)) {
            out.push(path);
        }
    }
    Ok(())
}

/// Parse units on scoped worker threads, preserving input order in the output.
fn parse_concurrently(units: &[Unit<'_>]) -> Vec<Result<(String, CatalogDocument), CatalogError>> {
    if units.len() <= 1 {
        return units.iter().map(parse_unit).collect();
    }

    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(units.len());
    let chunk_size = units.len().div_ceil(workers);

    std::thread::scope(|scope| {
        let handles: Vec<_> = units
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || chunk.iter().map(parse_unit).collect::<Vec<_>>()))
            .collect();

        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    })
}

fn parse_unit(unit: &Unit<'_>) -> Result<(String, CatalogDocument), CatalogError> {
    let name = unit.name();
    let owned;
    let content = match unit {
        Unit::Path(path) => {
            owned = std::fs::read_to_string(path).map_err(|e| CatalogError::Read {
                path: path.clone(),
                source: e,
            })?;
            owned.as_str()
        }
        Unit::Inline { content, .. } => *content,
    };

    let doc: CatalogDocument = serde_yaml::from_str(content).map_err(|e| CatalogError::Yaml {
        source_name: name.clone(),
        message: e.to_string(),
    })?;
    debug!(
        source = %name,
        rules = doc.rules.len(),
        variables = doc.variables.len(),
        "parsed catalog document"
    );
    Ok((name, doc))
}
