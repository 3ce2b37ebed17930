//! Directive resolver.
//!
//! Turns a [`DirectiveRef`] (name, path, raw operations or function) into a
//! single [`Transformation`]. Wrappers for names and paths are memoized, so
//! the same directive referenced from several pipelines is built once.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::operation::Operation;
use crate::registry::{Directive, DirectiveRegistry};
use crate::transformation::{SubstitutionTransform, Transformation};

/// A reference to a directive, classified once when a pipeline is built.
#[derive(Clone)]
pub enum DirectiveRef {
    /// Registered directive name, or path to a rule file.
    Named(String),
    /// Raw operation list.
    Operations(Vec<Operation>),
    /// Ready-made transformation.
    Function(Arc<dyn Transformation>),
}

impl DirectiveRef {
    pub fn function<T>(transformation: T) -> Self
    where
        T: Transformation + 'static,
    {
        DirectiveRef::Function(Arc::new(transformation))
    }

    /// Short description used in logs and error messages.
    pub fn label(&self) -> String {
        match self {
            DirectiveRef::Named(name) => name.clone(),
            DirectiveRef::Operations(ops) => format!("<{} operations>", ops.len()),
            DirectiveRef::Function(_) => "<function>".to_string(),
        }
    }
}

impl From<&str> for DirectiveRef {
    fn from(reference: &str) -> Self {
        DirectiveRef::Named(reference.to_string())
    }
}

impl From<String> for DirectiveRef {
    fn from(reference: String) -> Self {
        DirectiveRef::Named(reference)
    }
}

impl From<&String> for DirectiveRef {
    fn from(reference: &String) -> Self {
        DirectiveRef::Named(reference.clone())
    }
}

impl From<Vec<Operation>> for DirectiveRef {
    fn from(operations: Vec<Operation>) -> Self {
        DirectiveRef::Operations(operations)
    }
}

impl From<Arc<dyn Transformation>> for DirectiveRef {
    fn from(transformation: Arc<dyn Transformation>) -> Self {
        DirectiveRef::Function(transformation)
    }
}

impl fmt::Debug for DirectiveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
            DirectiveRef::Operations(ops) => f.debug_tuple("Operations").field(ops).finish(),
            DirectiveRef::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Resolves directive references against a registry it owns.
pub struct Resolver {
    registry: DirectiveRegistry,
    cache: HashMap<String, Arc<dyn Transformation>>,
    verbose: bool,
}

impl Resolver {
    pub fn new(registry: DirectiveRegistry) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
            verbose: false,
        }
    }

    /// Build substitution wrappers that log each regex operation at `info`.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn registry(&self) -> &DirectiveRegistry {
        &self.registry
    }

    pub fn into_registry(self) -> DirectiveRegistry {
        self.registry
    }

    /// Register `directive` under `key`, dropping any memoized wrapper for it.
    pub fn register(&mut self, key: impl Into<String>, directive: Directive) -> Option<Directive> {
        let key = key.into();
        self.cache.remove(&key);
        self.registry.register(key, directive)
    }

    /// Resolve `reference` to a transformation.
    ///
    /// Functions are used as-is; names and paths are looked up (loading rule
    /// files on first use) and memoized; raw operation lists are wrapped
    /// directly.
    pub fn resolve(&mut self, reference: &DirectiveRef) -> Result<Arc<dyn Transformation>> {
        match reference {
            DirectiveRef::Function(transformation) => Ok(Arc::clone(transformation)),
            DirectiveRef::Named(key) => self.resolve_named(key),
            DirectiveRef::Operations(operations) => {
                let transform = SubstitutionTransform::anonymous(operations.clone().into())
                    .verbose(self.verbose);
                Ok(Arc::new(transform))
            }
        }
    }

    fn resolve_named(&mut self, key: &str) -> Result<Arc<dyn Transformation>> {
        if let Some(cached) = self.cache.get(key) {
            return Ok(Arc::clone(cached));
        }

        if let Some(name) = self.registry.ensure_registered(key)? {
            // A lazily loaded file may have replaced the entry under its name.
            self.cache.remove(&name);
        }

        let directive = self
            .registry
            .get_or_register(key)?
            .clone();

        let transformation: Arc<dyn Transformation> = match directive {
            Directive::Function(function) => function,
            Directive::Operations(operations) => {
                Arc::new(SubstitutionTransform::new(key, operations).verbose(self.verbose))
            }
        };

        debug!(directive = key, "Resolved directive");
        self.cache.insert(key.to_string(), Arc::clone(&transformation));
        Ok(transformation)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("registry", &self.registry)
            .field("cached", &self.cache.len())
            .field("verbose", &self.verbose)
            .finish()
    }
}
