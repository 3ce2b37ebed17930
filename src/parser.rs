//! Pattern parser: rule sources to ordered operations.
//!
//! Three source shapes are understood:
//!
//! - delimited text, one rule per line (`search<TAB>replace<TAB>kind  # comment`),
//!   optionally starting with a `# {...}` config line
//! - mappings of `search -> replace` or `search -> [replace, kind, comment]`
//! - structured YAML/JSON documents with `substitutions` and optional `options`
//!
//! Every shape goes through [`RuleRow`] and [`build_operation`], so a mapping
//! entry and the equivalent delimited row yield identical operations.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde_yaml::Value;
use tracing::debug;

use crate::error::{DirectiveError, Result};
use crate::operation::{build_operation, scalar_to_string, Operation, RowDefaults, RuleRow};
use crate::options::{extract_first_line_config, SourceOptions};

/// Default field separator for delimited rule files.
pub const DEFAULT_SEPARATOR: &str = "\t";

/// Comment marker for delimited rule files.
pub const COMMENT_MARKER: char = '#';

/// How delimited text is split into rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedOptions {
    pub separator: String,
    /// Split off `# trailing comment` text before splitting fields, keeping it
    /// as the row's comment. Disable for rule sets whose patterns contain `#`.
    pub trim_line_comments: bool,
    /// Honour a `# {...}` config line at the top of the source.
    pub extract_config_line: bool,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            trim_line_comments: true,
            extract_config_line: true,
        }
    }
}

/// Operations parsed from one source, with the resolved directive name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDirective {
    pub name: String,
    pub operations: Vec<Operation>,
}

/// Storage format of a rule file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited,
    Yaml,
    Json,
}

impl SourceFormat {
    /// Map a format tag or file extension to a format.
    ///
    /// Returns `None` for unknown tags. `pickle` is recognized but has no
    /// loader, so it is reported as unsupported by [`SourceFormat::detect`].
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "json" => Some(SourceFormat::Json),
            "yaml" | "yml" => Some(SourceFormat::Yaml),
            "txt" | "tsv" | "text" | "patterns" => Some(SourceFormat::Delimited),
            _ => None,
        }
    }

    /// Pick the format for `path`: explicit tag first, then the extension.
    ///
    /// An explicit tag must be known; an unknown extension falls back to
    /// delimited text.
    pub fn detect(path: &Path, explicit: Option<&str>) -> Result<Self> {
        if let Some(tag) = explicit {
            return Self::from_tag(tag).ok_or_else(|| DirectiveError::UnsupportedFormat {
                format: tag.to_string(),
                path: path.to_path_buf(),
            });
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("pickle") => {
                Err(DirectiveError::UnsupportedFormat {
                    format: ext.to_string(),
                    path: path.to_path_buf(),
                })
            }
            Some(ext) => Ok(Self::from_tag(ext).unwrap_or(SourceFormat::Delimited)),
            None => Ok(SourceFormat::Delimited),
        }
    }
}

/// Split delimited text into rows, returning `(line_number, row)` pairs.
///
/// Blank lines and full-line comments (including the config line) are
/// dropped. Line numbers are 1-based positions in `text`.
pub fn delimited_rows(text: &str, options: &DelimitedOptions) -> Result<Vec<(usize, RuleRow)>> {
    let mut rows = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            continue;
        }

        let (data, comment) = if options.trim_line_comments {
            match line.split_once(COMMENT_MARKER) {
                Some((data, comment)) => {
                    let comment = comment.trim();
                    let data = data.trim_end_matches(|c: char| {
                        c.is_whitespace() && !options.separator.contains(c)
                    });
                    (data, (!comment.is_empty()).then(|| comment.to_string()))
                }
                None => (line, None),
            }
        } else {
            (line, None)
        };

        let data = data.trim_end_matches(options.separator.as_str());
        let fields: Vec<&str> = data.split(options.separator.as_str()).collect();
        if fields.len() > 3 {
            debug!(line = line_no, fields = fields.len(), "Ignoring fields beyond the third");
        }

        let row = RuleRow::from_fields(&fields, comment)
            .map_err(|message| DirectiveError::parse("", line_no, message))?;
        rows.push((line_no, row));
    }

    Ok(rows)
}

/// Parse delimited rule text.
///
/// The directive is named by the config line's `name`, else `source_name`.
pub fn parse_delimited(
    text: &str,
    source_name: &str,
    options: &DelimitedOptions,
) -> Result<ParsedDirective> {
    let (config, operations) = delimited_source(text, source_name, options)?;
    Ok(ParsedDirective {
        name: config.name.unwrap_or_else(|| source_name.to_string()),
        operations,
    })
}

fn delimited_source(
    text: &str,
    source_name: &str,
    options: &DelimitedOptions,
) -> Result<(SourceOptions, Vec<Operation>)> {
    let config = if options.extract_config_line {
        extract_first_line_config(text)
    } else {
        SourceOptions::default()
    };
    let defaults = config.row_defaults();

    let operations = delimited_rows(text, options)
        .map_err(|e| e.at_source(source_name))?
        .into_iter()
        .map(|(line_no, row)| build_operation(row, &defaults).map_err(|e| e.at(source_name, line_no)))
        .collect::<Result<Vec<_>>>()?;

    Ok((config, operations))
}

/// Parse a `search -> replacement` mapping, in key order.
///
/// Values may be a replacement string or a `[replace, kind, comment]`
/// sequence. Rows are numbered from 1 in key order for error reporting.
pub fn parse_mapping(
    map: &IndexMap<String, Value>,
    source_name: &str,
    defaults: &RowDefaults,
) -> Result<Vec<Operation>> {
    map.iter()
        .enumerate()
        .map(|(index, (key, value))| {
            let row = RuleRow::from_mapping_entry(key, value)
                .map_err(|message| DirectiveError::parse(source_name, index + 1, message))?;
            build_operation(row, defaults).map_err(|e| e.at(source_name, index + 1))
        })
        .collect()
}

/// Parse a structured document (`substitutions` plus optional `options`).
///
/// `overrides` are merged over the document's own `options`.
pub fn parse_document(
    doc: &Value,
    source_name: &str,
    overrides: &SourceOptions,
) -> Result<ParsedDirective> {
    let (options, operations) = document_source(doc, source_name, overrides)?;
    Ok(ParsedDirective {
        name: options.name.unwrap_or_else(|| source_name.to_string()),
        operations,
    })
}

fn document_source(
    doc: &Value,
    source_name: &str,
    overrides: &SourceOptions,
) -> Result<(SourceOptions, Vec<Operation>)> {
    let root = doc
        .as_mapping()
        .ok_or_else(|| DirectiveError::parse(source_name, 0, "document root must be a mapping"))?;

    let mut options: SourceOptions = match root.get("options") {
        None | Some(Value::Null) => SourceOptions::default(),
        Some(value) => serde_yaml::from_value(value.clone()).map_err(|e| {
            DirectiveError::parse(source_name, 0, format!("invalid 'options': {}", e))
        })?,
    };
    options.merge(overrides);
    let defaults = options.row_defaults();

    let substitutions = root
        .get("substitutions")
        .ok_or_else(|| DirectiveError::parse(source_name, 0, "missing 'substitutions' key"))?;

    let rows: Vec<std::result::Result<RuleRow, String>> = match substitutions {
        Value::Sequence(items) => items.iter().map(RuleRow::from_yaml).collect(),
        Value::Mapping(map) => map
            .iter()
            .map(|(key, value)| {
                let key = scalar_to_string(key)?
                    .ok_or_else(|| "null search pattern key".to_string())?;
                RuleRow::from_mapping_entry(&key, value)
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            return Err(DirectiveError::parse(
                source_name,
                0,
                format!("'substitutions' must be a list or mapping, got {:?}", other),
            ))
        }
    };

    let operations = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            let row = row.map_err(|message| DirectiveError::parse(source_name, index + 1, message))?;
            build_operation(row, &defaults).map_err(|e| e.at(source_name, index + 1))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((options, operations))
}

/// Load a rule file.
///
/// The format comes from `format` or the file extension. The directive name
/// is `name` if given, else the source's `name` option, else the file name up
/// to its first `.`.
pub fn load_pattern_file(
    path: impl AsRef<Path>,
    format: Option<&str>,
    name: Option<&str>,
) -> Result<ParsedDirective> {
    let path = path.as_ref();
    let format = SourceFormat::detect(path, format)?;
    let contents = fs::read_to_string(path).map_err(|e| DirectiveError::io(path, e))?;
    let label = path.display().to_string();

    let (options, operations) = match format {
        SourceFormat::Delimited => {
            delimited_source(&contents, &label, &DelimitedOptions::default())?
        }
        SourceFormat::Yaml => {
            let doc: Value = serde_yaml::from_str(&contents)?;
            document_source(&doc, &label, &SourceOptions::default())?
        }
        SourceFormat::Json => {
            let doc: Value = serde_json::from_str(&contents)?;
            document_source(&doc, &label, &SourceOptions::default())?
        }
    };

    let name = name
        .map(str::to_string)
        .or(options.name)
        .unwrap_or_else(|| directive_name_from_path(path));

    debug!(
        path = %path.display(),
        directive = %name,
        operations = operations.len(),
        "Loaded pattern file"
    );

    Ok(ParsedDirective { name, operations })
}

/// Directive name for a rule file: its file name up to the first `.`.
pub fn directive_name_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name,
    }
}
