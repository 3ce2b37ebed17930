//! Per-source default options.
//!
//! A delimited rule file may start with a config line such as
//! `# {type: 1, name: units}`; a structured document carries the same keys
//! under `options`. Both deserialize into [`SourceOptions`].

use serde::Deserialize;
use tracing::warn;

use crate::operation::{PatternKind, RowDefaults};

/// Marker that turns a leading comment line into a config line.
pub const CONFIG_LINE_MARKER: &str = "# {";

/// Default field values for every row of one rule source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourceOptions {
    /// Directive name, overriding the one derived from the file name.
    #[serde(default)]
    pub name: Option<String>,

    /// Default kind for rows that leave it unset; wins over `defaults.type`.
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: Option<PatternKind>,

    #[serde(default)]
    pub defaults: Option<FieldDefaults>,
}

/// The `defaults` block of [`SourceOptions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FieldDefaults {
    #[serde(default, alias = "replace_pattern")]
    pub replace_pat: Option<String>,

    #[serde(default, rename = "type", alias = "kind")]
    pub kind: Option<PatternKind>,

    #[serde(default)]
    pub comment: Option<String>,
}

impl SourceOptions {
    /// Overlay `other` on top of `self`; set fields in `other` win.
    pub fn merge(&mut self, other: &SourceOptions) {
        if other.name.is_some() {
            self.name = other.name.clone();
        }
        if other.kind.is_some() {
            self.kind = other.kind;
        }
        if let Some(theirs) = &other.defaults {
            let ours = self.defaults.get_or_insert_with(FieldDefaults::default);
            if theirs.replace_pat.is_some() {
                ours.replace_pat = theirs.replace_pat.clone();
            }
            if theirs.kind.is_some() {
                ours.kind = theirs.kind;
            }
            if theirs.comment.is_some() {
                ours.comment = theirs.comment.clone();
            }
        }
    }

    /// Resolve the row defaults: baseline, then `defaults`, then `type`.
    pub fn row_defaults(&self) -> RowDefaults {
        let mut defaults = RowDefaults::default();
        if let Some(fields) = &self.defaults {
            if let Some(replace) = &fields.replace_pat {
                defaults.replace_pattern = replace.clone();
            }
            if let Some(kind) = fields.kind {
                defaults.kind = kind;
            }
            if fields.comment.is_some() {
                defaults.comment = fields.comment.clone();
            }
        }
        if let Some(kind) = self.kind {
            defaults.kind = kind;
        }
        defaults
    }
}

/// Read the config line at the top of a delimited rule source, if any.
///
/// A malformed config line is logged and recovered as empty options.
pub fn extract_first_line_config(text: &str) -> SourceOptions {
    let first = match text.lines().map(str::trim).find(|l| !l.is_empty()) {
        Some(line) => line,
        None => return SourceOptions::default(),
    };

    if !first.starts_with(CONFIG_LINE_MARKER) {
        return SourceOptions::default();
    }

    let body = first.trim_start_matches(['#', ' ']).trim_end();
    match serde_yaml::from_str::<SourceOptions>(body) {
        Ok(options) => options,
        Err(e) => {
            warn!(
                line = first,
                error = %e,
                "ConfigRecoveryWarning: malformed first-line config, using empty options"
            );
            SourceOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_config_line() {
        let text = "# {type: 1, name: units}\ncm\tcentimeters\n";
        let options = extract_first_line_config(text);
        assert_eq!(options.kind, Some(PatternKind::Literal));
        assert_eq!(options.name.as_deref(), Some("units"));
    }

    #[test]
    fn test_config_line_with_named_kind() {
        let options = extract_first_line_config("# {type: fixed}");
        assert_eq!(options.kind, Some(PatternKind::Literal));
    }

    #[test]
    fn test_config_must_be_first_line() {
        let text = "a\tb\n# {type: 1}\n";
        assert_eq!(extract_first_line_config(text), SourceOptions::default());
    }

    #[test]
    fn test_plain_comment_is_not_config() {
        assert_eq!(
            extract_first_line_config("# just a note\na\tb"),
            SourceOptions::default()
        );
    }

    #[test]
    fn test_malformed_config_recovers() {
        let options = extract_first_line_config("# {type: [1\n");
        assert_eq!(options, SourceOptions::default());

        let options = extract_first_line_config("# {type: 7}\n");
        assert_eq!(options, SourceOptions::default());
    }

    #[test]
    fn test_row_defaults_precedence() {
        let options: SourceOptions = serde_yaml::from_str(
            "{type: 1, defaults: {type: 0, replace_pat: ' ', comment: c}}",
        )
        .unwrap();
        let defaults = options.row_defaults();
        assert_eq!(defaults.kind, PatternKind::Literal);
        assert_eq!(defaults.replace_pattern, " ");
        assert_eq!(defaults.comment.as_deref(), Some("c"));
    }

    #[test]
    fn test_merge_overrides_win() {
        let mut base: SourceOptions =
            serde_yaml::from_str("{name: a, defaults: {replace_pat: x}}").unwrap();
        let overrides: SourceOptions =
            serde_yaml::from_str("{type: literal, defaults: {comment: note}}").unwrap();
        base.merge(&overrides);

        assert_eq!(base.name.as_deref(), Some("a"));
        assert_eq!(base.kind, Some(PatternKind::Literal));
        let defaults = base.defaults.unwrap();
        assert_eq!(defaults.replace_pat.as_deref(), Some("x"));
        assert_eq!(defaults.comment.as_deref(), Some("note"));
    }
}
