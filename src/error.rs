//! Error types for rule parsing, directive resolution and substitution.

use std::path::PathBuf;

/// Errors raised while loading, resolving or applying directives.
#[derive(Debug, thiserror::Error)]
pub enum DirectiveError {
    /// Malformed rule row (empty search pattern, bad kind value, ...).
    #[error("Parse error in '{source_name}' (row {row}): {message}")]
    Parse {
        source_name: String,
        row: usize,
        message: String,
    },

    /// Format tag that no loader understands.
    #[error("Unsupported format '{format}' for '{}'", .path.display())]
    UnsupportedFormat { format: String, path: PathBuf },

    /// Reference is neither a registered name nor an existing file.
    #[error("Unknown directive '{0}': not a registered name or an existing file")]
    UnknownDirective(String),

    /// Regex compilation, replacement escape or back-reference failure.
    #[error("Substitution error for pattern '{pattern}': {message}")]
    Substitution { pattern: String, message: String },

    /// Failure reported by a functional transformation or pipeline stage.
    #[error("Transformation '{directive}' failed: {message}")]
    Transform { directive: String, message: String },

    /// A pipeline stage failed; `source` is the stage's own error.
    #[error("Directive '{directive}' failed")]
    Stage {
        directive: String,
        #[source]
        source: Box<DirectiveError>,
    },

    /// Bad output file name template.
    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error for '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DirectiveError {
    pub(crate) fn parse(source_name: &str, row: usize, message: impl Into<String>) -> Self {
        DirectiveError::Parse {
            source_name: source_name.to_string(),
            row,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DirectiveError::Io {
            path: path.into(),
            source,
        }
    }

    /// The innermost error below any pipeline stage wrappers.
    pub fn root_cause(&self) -> &DirectiveError {
        let mut current = self;
        while let DirectiveError::Stage { source, .. } = current {
            current = source;
        }
        current
    }

    /// Attach the source name to a parse error, keeping its row.
    pub(crate) fn at_source(self, source_name: &str) -> Self {
        match self {
            DirectiveError::Parse { row, message, .. } => DirectiveError::Parse {
                source_name: source_name.to_string(),
                row,
                message,
            },
            other => other,
        }
    }

    /// Attach the source name and row to a parse error raised without them.
    pub(crate) fn at(self, source_name: &str, row: usize) -> Self {
        match self {
            DirectiveError::Parse { message, .. } => DirectiveError::Parse {
                source_name: source_name.to_string(),
                row,
                message,
            },
            DirectiveError::Substitution { pattern, message } => DirectiveError::Substitution {
                pattern,
                message: format!("{} (in '{}', row {})", message, source_name, row),
            },
            other => other,
        }
    }
}

/// Result alias for directive operations.
pub type Result<T> = std::result::Result<T, DirectiveError>;
