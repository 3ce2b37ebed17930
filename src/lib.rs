//! # tts-preprocessor: rule-driven text rewriting for text-to-speech
//!
//! Strips markup and normalizes vocabulary by applying ordered sets of
//! search/replace rules ("directives") to text.
//!
//! ## Features
//!
//! - **Operations**: literal or regex rules, compiled once when loaded
//! - **Rule sources**: tab-delimited text with a `# {...}` config line, key/value
//!   mappings, and YAML/JSON documents with `substitutions` and `options`
//! - **Registry**: directives by name or file path, discovered from a data
//!   directory or loaded on first reference
//! - **Resolver and pipelines**: names, paths, raw rule lists and functions
//!   resolved once into `text -> text` transformations and chained
//! - **Built-in LaTeX directive**: `latex_to_text` for reading papers aloud
//!
//! ## Example rule file
//!
//! ```text
//! # {type: 0}
//! e.g.	for example	1   # literal
//! \s+	 	0
//! ```
//!
//! ## Example
//!
//! ```
//! use tts_preprocessor::{DirectiveRegistry, Operation, Pipeline, Resolver};
//!
//! let mut registry = DirectiveRegistry::new();
//! registry.register_operations(
//!     "abbrev",
//!     vec![
//!         Operation::literal("e.g.", "for example").unwrap(),
//!         Operation::regex(r"\s+", " ").unwrap(),
//!     ],
//! );
//!
//! let mut resolver = Resolver::new(registry);
//! let pipeline = Pipeline::build(&mut resolver, ["abbrev"]).unwrap();
//! assert_eq!(pipeline.run("Use e.g.   this.").unwrap(), "Use for example this.");
//! ```

pub mod engine;
pub mod error;
pub mod files;
pub mod latex;
pub mod operation;
pub mod options;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod transformation;

// Re-export key types
pub use engine::{apply, apply_verbose};
pub use error::{DirectiveError, Result};
pub use files::{default_directives_for, process_file, OutputNameFormat};
pub use latex::{latex_to_text, register_builtins};
pub use operation::{build_operation, Operation, PatternKind, RowDefaults, RuleRow};
pub use options::{extract_first_line_config, SourceOptions};
pub use parser::{
    load_pattern_file, parse_delimited, parse_document, parse_mapping, DelimitedOptions,
    ParsedDirective, SourceFormat,
};
pub use pipeline::Pipeline;
pub use registry::{Directive, DirectiveRegistry};
pub use resolver::{DirectiveRef, Resolver};
pub use transformation::{SubstitutionTransform, Transformation};
