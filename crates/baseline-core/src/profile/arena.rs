//! Arena of profiles keyed by id.
//!
//! `extends` references are resolved by id lookup in the arena, never through
//! object references, so a resolved profile cannot be mutated through its
//! ancestry.

use super::{parser, ParseError, Profile};
use globset::Glob;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// File extension of profile documents.
pub const PROFILE_EXTENSION: &str = "profile";

#[derive(Debug, Clone, Default)]
pub struct ProfileArena {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a profile, returning any profile previously stored under its id.
    pub fn insert(&mut self, profile: Profile) -> Option<Profile> {
        self.profiles.insert(profile.id.clone(), profile)
    }

    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.profiles.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.profiles.contains_key(id)
    }

    /// Profile ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Load every `<id>.profile` document directly inside `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, ParseError> {
        let matcher = Glob::new(&format!("*.{}", PROFILE_EXTENSION))
            .map_err(|e| ParseError::Schema {
                profile: dir.display().to_string(),
                message: e.to_string(),
            })?
            .compile_matcher();

        let read_err = |source| ParseError::Read {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            if path.is_file() && path.file_name().is_some_and(|n| matcher.is_match(n)) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut arena = Self::new();
        for path in paths {
            let profile = load_file(&path)?;
            debug!(profile = %profile.id, path = %path.display(), "loaded profile");
            arena.insert(profile);
        }
        Ok(arena)
    }
}

/// Load a single profile document; its id is the file stem.
pub fn load_file(path: &Path) -> Result<Profile, ParseError> {
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ParseError::Schema {
            profile: path.display().to_string(),
            message: "cannot derive profile id from file name".to_string(),
        })?;

    let content = std::fs::read_to_string(path).map_err(|e| ParseError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    parser::parse(id, &content)
}
