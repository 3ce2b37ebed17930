//! Pipeline composer: chains resolved transformations into one function.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{DirectiveError, Result};
use crate::resolver::{DirectiveRef, Resolver};
use crate::transformation::Transformation;

struct Stage {
    label: String,
    transformation: Arc<dyn Transformation>,
}

/// An ordered composition of transformations applied to one text value.
///
/// A pipeline is itself a [`Transformation`], so pipelines nest.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every reference once, in order, into a pipeline.
    pub fn build<I, R>(resolver: &mut Resolver, references: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: Into<DirectiveRef>,
    {
        let mut pipeline = Self::new();
        for reference in references {
            let reference = reference.into();
            let transformation = resolver.resolve(&reference)?;
            pipeline.push(reference.label(), transformation);
        }
        Ok(pipeline)
    }

    /// Append a stage.
    pub fn push(&mut self, label: impl Into<String>, transformation: Arc<dyn Transformation>) {
        self.stages.push(Stage {
            label: label.into(),
            transformation,
        });
    }

    /// Builder-style [`Pipeline::push`].
    pub fn then(mut self, label: impl Into<String>, transformation: Arc<dyn Transformation>) -> Self {
        self.push(label, transformation);
        self
    }

    /// Run `text` through every stage in order.
    ///
    /// A failing stage stops the pipeline. The error is a
    /// [`DirectiveError::Stage`] naming the stage and wrapping its error; an
    /// error already wrapped by a nested pipeline is passed through.
    pub fn run(&self, text: &str) -> Result<String> {
        let mut current = text.to_string();
        for stage in &self.stages {
            debug!(stage = %stage.label, "Applying directive");
            current = stage
                .transformation
                .transform(&current)
                .map_err(|e| match e {
                    DirectiveError::Stage { .. } => e,
                    other => DirectiveError::Stage {
                        directive: stage.label.clone(),
                        source: Box::new(other),
                    },
                })?;
        }
        Ok(current)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Transformation for Pipeline {
    fn transform(&self, text: &str) -> Result<String> {
        self.run(text)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("stages", &self.labels()).finish()
    }
}
