//! Directive registry.
//!
//! Maps directive names and rule-file paths to their operations, or to an
//! opaque [`Transformation`] for functional directives. Built by an explicit
//! bootstrap step ([`DirectiveRegistry::discover`]) and extended lazily when a
//! rule file is first referenced by path.
//!
//! The registry does no locking. Finish registering before sharing it.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{DirectiveError, Result};
use crate::operation::Operation;
use crate::parser::load_pattern_file;
use crate::transformation::Transformation;

/// Extensions of source-code files that directory discovery never loads.
const SOURCE_EXTENSIONS: &[&str] = &["rs"];

/// A registered directive.
#[derive(Clone)]
pub enum Directive {
    /// Ordered substitution operations.
    Operations(Arc<[Operation]>),
    /// Opaque text-to-text function.
    Function(Arc<dyn Transformation>),
}

impl Directive {
    pub fn operations(&self) -> Option<&[Operation]> {
        match self {
            Directive::Operations(ops) => Some(ops),
            Directive::Function(_) => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Directive::Function(_))
    }
}

impl From<Vec<Operation>> for Directive {
    fn from(operations: Vec<Operation>) -> Self {
        Directive::Operations(operations.into())
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Operations(ops) => f.debug_tuple("Operations").field(&ops.len()).finish(),
            Directive::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Catalog of directives keyed by name or file path.
#[derive(Debug, Default)]
pub struct DirectiveRegistry {
    entries: HashMap<String, Directive>,
}

impl DirectiveRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every rule file found under `directory`.
    pub fn from_dir(directory: impl AsRef<Path>) -> Result<Self> {
        let mut registry = Self::new();
        registry.discover(directory)?;
        Ok(registry)
    }

    /// Store `directive` under `key`, replacing any previous entry.
    ///
    /// Returns the replaced entry. Replacing is logged as a warning, since it
    /// usually means two rule files share a name.
    pub fn register(&mut self, key: impl Into<String>, directive: Directive) -> Option<Directive> {
        let key = key.into();
        let previous = self.entries.insert(key.clone(), directive);
        if previous.is_some() {
            warn!(directive = %key, "Directive registered twice; keeping the latest");
        }
        previous
    }

    pub fn register_operations(
        &mut self,
        key: impl Into<String>,
        operations: Vec<Operation>,
    ) -> Option<Directive> {
        self.register(key, Directive::from(operations))
    }

    /// Register an external text transformer under a fixed name.
    pub fn register_function<T>(&mut self, key: impl Into<String>, transformation: T) -> Option<Directive>
    where
        T: Transformation + 'static,
    {
        self.register(key, Directive::Function(Arc::new(transformation)))
    }

    /// Parse a rule file and register it under its directive name and its path.
    ///
    /// Returns the directive name.
    pub fn register_file(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let parsed = load_pattern_file(path, None, None)?;
        let directive = Directive::from(parsed.operations);

        self.register(parsed.name.clone(), directive.clone());
        let path_key = path.to_string_lossy().into_owned();
        if path_key != parsed.name {
            self.register(path_key, directive);
        }

        debug!(path = %path.display(), directive = %parsed.name, "Registered rule file");
        Ok(parsed.name)
    }

    /// Register every rule file below `directory`, recursively.
    ///
    /// Symlinks are followed. Skips files whose name starts with `.` or `_`
    /// and source-code files. Returns the number of files registered.
    pub fn discover(&mut self, directory: impl AsRef<Path>) -> Result<usize> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            return Err(DirectiveError::io(
                directory,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        let mut count = 0;
        for entry in WalkDir::new(directory).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.loop_ancestor().is_some() => {
                    warn!(path = ?e.path(), "Skipping symlink loop");
                    continue;
                }
                Err(e) => {
                    let path = e.path().unwrap_or(directory).to_path_buf();
                    return Err(DirectiveError::io(path, e.into()));
                }
            };
            if !entry.file_type().is_file() || !is_discoverable(entry.path()) {
                continue;
            }
            self.register_file(entry.path())?;
            count += 1;
        }

        info!(directory = %directory.display(), count, "Discovered rule files");
        Ok(count)
    }

    /// Make sure `reference` is registered.
    ///
    /// An existing file that is not yet registered is loaded now, and its
    /// directive name is returned. A file already loaded or a known name
    /// returns `Ok(None)`.
    pub fn ensure_registered(&mut self, reference: &str) -> Result<Option<String>> {
        if self.entries.contains_key(reference) {
            return Ok(None);
        }
        if Path::new(reference).is_file() {
            return self.register_file(reference).map(Some);
        }
        Err(DirectiveError::UnknownDirective(reference.to_string()))
    }

    /// Look up `reference`, loading it first if it is an unregistered file.
    pub fn get_or_register(&mut self, reference: &str) -> Result<&Directive> {
        self.ensure_registered(reference)?;
        self.entries
            .get(reference)
            .ok_or_else(|| DirectiveError::UnknownDirective(reference.to_string()))
    }

    pub fn get(&self, key: &str) -> Option<&Directive> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// All registered keys, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether directory discovery should load `path`.
pub fn is_discoverable(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(true, |n| n.starts_with('.') || n.starts_with('_'));
    if hidden {
        return false;
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            !(ext.starts_with("py") || SOURCE_EXTENSIONS.contains(&ext.as_str()))
        }
        None => true,
    }
}
