//! Text transformations.
//!
//! A [`Transformation`] is any `text -> text` function. Operation lists are
//! wrapped in a [`SubstitutionTransform`]; external converters (a LaTeX macro
//! expander, say) are plain closures registered under a fixed name.

use std::fmt;
use std::sync::Arc;

use crate::engine;
use crate::error::Result;
use crate::operation::Operation;

/// A pure `text -> text` function.
pub trait Transformation: Send + Sync {
    /// Transform `text`, returning a new value.
    fn transform(&self, text: &str) -> Result<String>;
}

/// Simple function-based implementation of Transformation
impl<F> Transformation for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn transform(&self, text: &str) -> Result<String> {
        self(text)
    }
}

/// Transformation backed by an ordered operation list.
#[derive(Clone)]
pub struct SubstitutionTransform {
    name: Option<String>,
    operations: Arc<[Operation]>,
    verbose: bool,
}

impl SubstitutionTransform {
    pub fn new(name: impl Into<String>, operations: Arc<[Operation]>) -> Self {
        Self {
            name: Some(name.into()),
            operations,
            verbose: false,
        }
    }

    /// Wrap a raw operation list that has no registry key.
    pub fn anonymous(operations: Arc<[Operation]>) -> Self {
        Self {
            name: None,
            operations,
            verbose: false,
        }
    }

    /// Log every regex operation at `info` instead of `trace`.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }
}

impl Transformation for SubstitutionTransform {
    fn transform(&self, text: &str) -> Result<String> {
        engine::apply_verbose(text, &self.operations, self.verbose)
    }
}

impl fmt::Debug for SubstitutionTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubstitutionTransform")
            .field("name", &self.name)
            .field("operations", &self.operations.len())
            .finish()
    }
}
