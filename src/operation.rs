//! Substitution operations and the canonical row-to-operation builder.
//!
//! An [`Operation`] is one search/replace rule. Regex operations compile their
//! pattern and parse their replacement template once, when the operation is
//! built, so bad rules are reported at load time.
//!
//! Patterns use the `regex` crate when they can. Patterns that need
//! look-around or back-references fall back to `fancy_regex`, which
//! backtracks and can hit its backtrack limit while matching.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{DirectiveError, Result};

/// How an operation's search pattern is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "KindRepr")]
pub enum PatternKind {
    /// Regular expression with back-references in the replacement (code `0`).
    #[default]
    Regex,
    /// Exact substring, replaced verbatim (code `1`).
    Literal,
}

impl PatternKind {
    /// Numeric code used in rule files.
    pub fn code(self) -> u8 {
        match self {
            PatternKind::Regex => 0,
            PatternKind::Literal => 1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(PatternKind::Regex),
            1 => Some(PatternKind::Literal),
            _ => None,
        }
    }

    /// Parse a kind field as written in a rule row.
    ///
    /// Accepts the numeric codes and the names `regex`/`re` and
    /// `literal`/`fixed`, case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(code) = raw.parse::<i64>() {
            return Self::from_code(code);
        }
        match raw.to_ascii_lowercase().as_str() {
            "regex" | "re" => Some(PatternKind::Regex),
            "literal" | "fixed" => Some(PatternKind::Literal),
            _ => None,
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::Regex => write!(f, "regex"),
            PatternKind::Literal => write!(f, "literal"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KindRepr {
    Code(i64),
    Name(String),
}

impl TryFrom<KindRepr> for PatternKind {
    type Error = String;

    fn try_from(repr: KindRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            KindRepr::Code(code) => PatternKind::from_code(code)
                .ok_or_else(|| format!("invalid pattern kind code {}", code)),
            KindRepr::Name(name) => PatternKind::parse(&name)
                .ok_or_else(|| format!("invalid pattern kind '{}'", name)),
        }
    }
}

/// Compiled search pattern.
#[derive(Clone)]
enum Matcher {
    Plain(regex::Regex),
    Backtracking(Arc<fancy_regex::Regex>),
}

impl Matcher {
    /// Compile `pattern`, trying the `regex` crate first.
    fn compile(pattern: &str) -> std::result::Result<Self, String> {
        let pattern = translate_pattern(pattern);
        match regex::Regex::new(&pattern) {
            Ok(regex) => Ok(Matcher::Plain(regex)),
            Err(_) => fancy_regex::Regex::new(&pattern)
                .map(|regex| Matcher::Backtracking(Arc::new(regex)))
                .map_err(|e| e.to_string()),
        }
    }

    /// Number of groups, counting the implicit whole-match group 0.
    fn captures_len(&self) -> usize {
        match self {
            Matcher::Plain(regex) => regex.captures_len(),
            Matcher::Backtracking(regex) => regex.captures_len(),
        }
    }

    fn group_index(&self, name: &str) -> Option<usize> {
        match self {
            Matcher::Plain(regex) => regex.capture_names().position(|n| n == Some(name)),
            Matcher::Backtracking(regex) => regex.capture_names().position(|n| n == Some(name)),
        }
    }

    fn replace_all<'t>(
        &self,
        text: &'t str,
        template: &[TemplatePart],
    ) -> std::result::Result<Cow<'t, str>, String> {
        let mut out = String::new();
        let mut last = 0;
        let mut matched = false;

        match self {
            Matcher::Plain(regex) => {
                for caps in regex.captures_iter(text) {
                    let Some(whole) = caps.get(0) else { continue };
                    out.push_str(&text[last..whole.start()]);
                    expand(template, &mut out, |i| caps.get(i).map(|m| m.as_str()));
                    last = whole.end();
                    matched = true;
                }
            }
            Matcher::Backtracking(regex) => {
                for caps in regex.captures_iter(text) {
                    let caps = caps.map_err(|e| e.to_string())?;
                    let Some(whole) = caps.get(0) else { continue };
                    out.push_str(&text[last..whole.start()]);
                    expand(template, &mut out, |i| caps.get(i).map(|m| m.as_str()));
                    last = whole.end();
                    matched = true;
                }
            }
        }

        if !matched {
            return Ok(Cow::Borrowed(text));
        }
        out.push_str(&text[last..]);
        Ok(Cow::Owned(out))
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Plain(regex) => f.debug_tuple("Plain").field(&regex.as_str()).finish(),
            Matcher::Backtracking(regex) => {
                f.debug_tuple("Backtracking").field(&regex.as_str()).finish()
            }
        }
    }
}

/// Parsed replacement template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplatePart {
    Text(String),
    Group(usize),
}

fn expand<'a>(template: &[TemplatePart], out: &mut String, group: impl Fn(usize) -> Option<&'a str>) {
    for part in template {
        match part {
            TemplatePart::Text(text) => out.push_str(text),
            // unmatched groups expand to nothing
            TemplatePart::Group(index) => out.push_str(group(*index).unwrap_or_default()),
        }
    }
}

/// Compiled form of a regex operation.
#[derive(Debug, Clone)]
struct CompiledRegex {
    matcher: Matcher,
    template: Vec<TemplatePart>,
}

/// One search/replace rule. Immutable once built.
#[derive(Debug, Clone)]
pub struct Operation {
    search_pattern: String,
    replace_pattern: String,
    kind: PatternKind,
    comment: Option<String>,
    compiled: Option<CompiledRegex>,
}

impl Operation {
    /// Build an operation, compiling regex patterns up front.
    ///
    /// # Errors
    ///
    /// * `Parse` if `search_pattern` is empty
    /// * `Substitution` if the regex does not compile, or the replacement has
    ///   an invalid escape or refers to a group the pattern does not define
    pub fn new(
        search_pattern: impl Into<String>,
        replace_pattern: impl Into<String>,
        kind: PatternKind,
        comment: Option<String>,
    ) -> Result<Self> {
        let search_pattern = search_pattern.into();
        let replace_pattern = replace_pattern.into();

        if search_pattern.is_empty() {
            return Err(DirectiveError::parse("", 0, "empty search pattern"));
        }

        let compiled = match kind {
            PatternKind::Literal => None,
            PatternKind::Regex => {
                let matcher =
                    Matcher::compile(&search_pattern).map_err(|message| {
                        DirectiveError::Substitution {
                            pattern: search_pattern.clone(),
                            message,
                        }
                    })?;
                let template = parse_replacement(&replace_pattern, &matcher).map_err(
                    |message| DirectiveError::Substitution {
                        pattern: search_pattern.clone(),
                        message,
                    },
                )?;
                Some(CompiledRegex { matcher, template })
            }
        };

        Ok(Self {
            search_pattern,
            replace_pattern,
            kind,
            comment,
            compiled,
        })
    }

    /// Shorthand for a literal operation without comment.
    pub fn literal(search: impl Into<String>, replace: impl Into<String>) -> Result<Self> {
        Self::new(search, replace, PatternKind::Literal, None)
    }

    /// Shorthand for a regex operation without comment.
    pub fn regex(search: impl Into<String>, replace: impl Into<String>) -> Result<Self> {
        Self::new(search, replace, PatternKind::Regex, None)
    }

    pub fn search_pattern(&self) -> &str {
        &self.search_pattern
    }

    pub fn replace_pattern(&self) -> &str {
        &self.replace_pattern
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Apply this single rule to `text`.
    ///
    /// Returns `Cow::Borrowed` when nothing matched.
    ///
    /// # Errors
    ///
    /// `Substitution` if a backtracking pattern exceeds its backtrack limit.
    pub fn apply<'t>(&self, text: &'t str) -> Result<Cow<'t, str>> {
        match &self.compiled {
            Some(compiled) => compiled
                .matcher
                .replace_all(text, &compiled.template)
                .map_err(|message| DirectiveError::Substitution {
                    pattern: self.search_pattern.clone(),
                    message,
                }),
            None => {
                if text.contains(self.search_pattern.as_str()) {
                    Ok(Cow::Owned(text.replace(&self.search_pattern, &self.replace_pattern)))
                } else {
                    Ok(Cow::Borrowed(text))
                }
            }
        }
    }
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.search_pattern == other.search_pattern
            && self.replace_pattern == other.replace_pattern
            && self.kind == other.kind
            && self.comment == other.comment
    }
}

impl Eq for Operation {}

/// Rewrite rule-file pattern syntax the regex engines spell differently.
///
/// `\Z` (end of text) becomes `\z`.
fn translate_pattern(pattern: &str) -> Cow<'_, str> {
    if !pattern.contains(r"\Z") {
        return Cow::Borrowed(pattern);
    }
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '\\' {
            match chars.next() {
                Some('Z') => out.push('z'),
                Some(next) => out.push(next),
                None => {}
            }
        }
    }
    Cow::Owned(out)
}

/// Parse a rule-file replacement template.
///
/// Back-references are written `\1`, `\g<1>` or `\g<name>`; `\g<0>` is the
/// whole match. `\0` and three-digit `\NNN` are octal character escapes.
/// `\n`, `\t`, `\\` and friends are the usual escapes; `$` is literal text.
fn parse_replacement(
    template: &str,
    matcher: &Matcher,
) -> std::result::Result<Vec<TemplatePart>, String> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            text.push(c);
            continue;
        }
        let next = chars
            .next()
            .ok_or_else(|| "bad escape (end of replacement)".to_string())?;
        match next {
            '0' => {
                let mut value = 0;
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                text.push(octal_char(value)?);
            }
            '1'..='9' => {
                let mut digits = String::from(next);
                if let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    digits.push(d);
                    chars.next();
                    let third = chars.peek().copied().filter(|c| c.is_digit(8));
                    if let Some(third) = third.filter(|_| digits.chars().all(|c| c.is_digit(8))) {
                        digits.push(third);
                        chars.next();
                        let value = u32::from_str_radix(&digits, 8)
                            .map_err(|_| format!("invalid octal escape \\{}", digits))?;
                        text.push(octal_char(value)?);
                        continue;
                    }
                }
                let index: usize = digits
                    .parse()
                    .map_err(|_| format!("invalid group reference '{}'", digits))?;
                check_group_index(matcher, index)?;
                push_group(&mut parts, &mut text, index);
            }
            'g' => {
                if chars.next() != Some('<') {
                    return Err("missing '<' after \\g".to_string());
                }
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('>') => break,
                        Some(ch) => name.push(ch),
                        None => return Err(format!("unterminated group name '{}'", name)),
                    }
                }
                let index = match name.parse::<usize>() {
                    Ok(index) => {
                        check_group_index(matcher, index)?;
                        index
                    }
                    Err(_) => matcher
                        .group_index(&name)
                        .ok_or_else(|| format!("unknown group name '{}'", name))?,
                };
                push_group(&mut parts, &mut text, index);
            }
            'n' => text.push('\n'),
            't' => text.push('\t'),
            'r' => text.push('\r'),
            'a' => text.push('\x07'),
            'b' => text.push('\x08'),
            'f' => text.push('\x0c'),
            'v' => text.push('\x0b'),
            '\\' => text.push('\\'),
            other if other.is_ascii_alphabetic() => {
                return Err(format!("bad escape \\{}", other));
            }
            other => {
                text.push('\\');
                text.push(other);
            }
        }
    }

    if !text.is_empty() {
        parts.push(TemplatePart::Text(text));
    }
    Ok(parts)
}

fn push_group(parts: &mut Vec<TemplatePart>, text: &mut String, index: usize) {
    if !text.is_empty() {
        parts.push(TemplatePart::Text(std::mem::take(text)));
    }
    parts.push(TemplatePart::Group(index));
}

fn octal_char(value: u32) -> std::result::Result<char, String> {
    if value > 0o377 {
        return Err(format!("octal escape value \\{:o} outside of range 0-0o377", value));
    }
    char::from_u32(value).ok_or_else(|| format!("invalid octal escape \\{:o}", value))
}

fn check_group_index(matcher: &Matcher, index: usize) -> std::result::Result<(), String> {
    if index >= matcher.captures_len() {
        Err(format!("invalid group reference {}", index))
    } else {
        Ok(())
    }
}

/// Field values used for anything a rule row leaves unset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowDefaults {
    pub replace_pattern: String,
    pub kind: PatternKind,
    pub comment: Option<String>,
}

/// A rule row before defaults are applied.
///
/// Delimited lines, sequences and mappings all become a `RuleRow` through the
/// constructors below, then [`build_operation`] finishes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleRow {
    pub search_pattern: Option<String>,
    pub replace_pattern: Option<String>,
    pub kind: Option<PatternKind>,
    pub comment: Option<String>,
}

impl RuleRow {
    pub fn new(search_pattern: impl Into<String>, replace_pattern: impl Into<String>) -> Self {
        Self {
            search_pattern: Some(search_pattern.into()),
            replace_pattern: Some(replace_pattern.into()),
            ..Default::default()
        }
    }

    /// Build a row from delimited text fields.
    ///
    /// Only the first three fields (search, replace, kind) are used; an empty
    /// kind field counts as unset.
    pub fn from_fields<S: AsRef<str>>(
        fields: &[S],
        comment: Option<String>,
    ) -> std::result::Result<Self, String> {
        let mut fields = fields.iter().map(|f| f.as_ref());
        let search_pattern = fields.next().map(str::to_string);
        let replace_pattern = fields.next().map(str::to_string);
        let kind = match fields.next().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                PatternKind::parse(raw).ok_or_else(|| format!("invalid pattern kind '{}'", raw))?,
            ),
        };

        Ok(Self {
            search_pattern,
            replace_pattern,
            kind,
            comment,
        })
    }

    /// Build a row from a YAML/JSON sequence or mapping.
    pub fn from_yaml(value: &Value) -> std::result::Result<Self, String> {
        match value {
            Value::Sequence(items) => Self::from_sequence(items),
            Value::Mapping(map) => {
                let mut row = RuleRow::default();
                for (key, field) in map {
                    let key = key
                        .as_str()
                        .ok_or_else(|| format!("non-string field name {:?}", key))?;
                    match key {
                        "search_pat" | "search_pattern" | "search" => {
                            row.search_pattern = scalar_to_string(field)?;
                        }
                        "replace_pat" | "replace_pattern" | "replace" => {
                            row.replace_pattern = scalar_to_string(field)?;
                        }
                        "type" | "kind" => row.kind = kind_from_yaml(field)?,
                        "comment" => row.comment = scalar_to_string(field)?,
                        other => return Err(format!("unknown field '{}'", other)),
                    }
                }
                Ok(row)
            }
            other => Err(format!("expected a sequence or mapping row, got {:?}", other)),
        }
    }

    /// Build a row from one `key -> value` entry of a mapping source.
    ///
    /// A sequence value expands to `[key] + value`, anything else to
    /// `[key, value]`.
    pub fn from_mapping_entry(key: &str, value: &Value) -> std::result::Result<Self, String> {
        let mut items = vec![Value::String(key.to_string())];
        match value {
            Value::Sequence(rest) => items.extend(rest.iter().cloned()),
            other => items.push(other.clone()),
        }
        Self::from_sequence(&items)
    }

    /// `[search, replace, kind, comment]`; further elements are ignored.
    fn from_sequence(items: &[Value]) -> std::result::Result<Self, String> {
        let field = |i: usize| -> std::result::Result<Option<String>, String> {
            items.get(i).map(scalar_to_string).transpose().map(Option::flatten)
        };
        Ok(Self {
            search_pattern: field(0)?,
            replace_pattern: field(1)?,
            kind: items.get(2).map(kind_from_yaml).transpose()?.flatten(),
            comment: field(3)?,
        })
    }
}

/// Render a scalar YAML value as a field string; `null` is unset.
pub(crate) fn scalar_to_string(value: &Value) -> std::result::Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(format!("expected a scalar field, got {:?}", other)),
    }
}

fn kind_from_yaml(value: &Value) -> std::result::Result<Option<PatternKind>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => PatternKind::parse(s)
            .map(Some)
            .ok_or_else(|| format!("invalid pattern kind '{}'", s)),
        Value::Number(n) => n
            .as_i64()
            .and_then(PatternKind::from_code)
            .map(Some)
            .ok_or_else(|| format!("invalid pattern kind code {}", n)),
        other => Err(format!("invalid pattern kind {:?}", other)),
    }
}

/// Finish a row into an [`Operation`], filling unset fields from `defaults`.
///
/// This is the only place rows become operations.
pub fn build_operation(row: RuleRow, defaults: &RowDefaults) -> Result<Operation> {
    let search = row.search_pattern.unwrap_or_default();
    Operation::new(
        search,
        row.replace_pattern
            .unwrap_or_else(|| defaults.replace_pattern.clone()),
        row.kind.unwrap_or(defaults.kind),
        row.comment.or_else(|| defaults.comment.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_replaces_exact_occurrences() {
        let op = Operation::literal(".", "X").unwrap();
        assert_eq!(op.apply("a.b.c").unwrap(), "aXbXc");
    }

    #[test]
    fn test_regex_dot_matches_every_char() {
        let op = Operation::regex(".", "X").unwrap();
        assert_eq!(op.apply("abc").unwrap(), "XXX");
    }

    #[test]
    fn test_literal_no_match_borrows() {
        let op = Operation::literal("zz", "y").unwrap();
        assert!(matches!(op.apply("abc").unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_empty_search_pattern_rejected() {
        let result = Operation::regex("", "x");
        assert!(matches!(result, Err(DirectiveError::Parse { .. })));
    }

    #[test]
    fn test_invalid_regex_is_substitution_error() {
        let result = Operation::regex("(unclosed", "x");
        match result {
            Err(DirectiveError::Substitution { pattern, .. }) => assert_eq!(pattern, "(unclosed"),
            other => panic!("expected substitution error, got {:?}", other),
        }
    }

    #[test]
    fn test_numbered_back_reference() {
        let op = Operation::regex(r"(\w+)@(\w+)", r"\2 at \1").unwrap();
        assert_eq!(op.apply("user@host").unwrap(), "host at user");
    }

    #[test]
    fn test_named_back_reference() {
        let op = Operation::regex(r"(?P<num>\d+)%", r"\g<num> percent").unwrap();
        assert_eq!(op.apply("50%").unwrap(), "50 percent");
    }

    #[test]
    fn test_back_reference_to_missing_group() {
        let result = Operation::regex(r"(a)", r"\2");
        assert!(matches!(result, Err(DirectiveError::Substitution { .. })));

        let result = Operation::regex(r"(a)", r"\g<nope>");
        assert!(matches!(result, Err(DirectiveError::Substitution { .. })));
    }

    #[test]
    fn test_bad_escape_in_replacement() {
        let result = Operation::regex("a", r"\q");
        assert!(matches!(result, Err(DirectiveError::Substitution { .. })));
    }

    #[test]
    fn test_dollar_is_literal_in_replacement() {
        let op = Operation::regex(r"(\d+) USD", r"$\1").unwrap();
        assert_eq!(op.apply("5 USD").unwrap(), "$5");
    }

    #[test]
    fn test_newline_escape_in_replacement() {
        let op = Operation::regex(r"<br>", r"\n").unwrap();
        assert_eq!(op.apply("a<br>b").unwrap(), "a\nb");
    }

    #[test]
    fn test_look_behind_pattern() {
        let op = Operation::regex(r"(?<=\d)cm\b", " centimeters").unwrap();
        assert_eq!(op.apply("5cm of cmx").unwrap(), "5 centimeters of cmx");
    }

    #[test]
    fn test_back_reference_inside_pattern() {
        let op = Operation::regex(r"\b(\w+) \1\b", r"\1").unwrap();
        assert_eq!(op.apply("the the cat").unwrap(), "the cat");
    }

    #[test]
    fn test_end_of_text_anchor() {
        let op = Operation::regex(r"\s+\Z", "").unwrap();
        assert_eq!(op.apply("line \nline  \n").unwrap(), "line \nline");
    }

    #[test]
    fn test_zero_escape_is_octal_not_whole_match() {
        let op = Operation::regex("x", r"[\0]").unwrap();
        assert_eq!(op.apply("x").unwrap(), "[\u{0}]");

        let op = Operation::regex("x", r"\101\g<0>").unwrap();
        assert_eq!(op.apply("x").unwrap(), "Ax");
    }

    #[test]
    fn test_octal_escape_out_of_range() {
        let result = Operation::regex("(a)", r"\477");
        assert!(matches!(result, Err(DirectiveError::Substitution { .. })));
    }

    #[test]
    fn test_unmatched_group_expands_empty() {
        let op = Operation::regex(r"a(b)?", r"[\1]").unwrap();
        assert_eq!(op.apply("a ab").unwrap(), "[] [b]");
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(PatternKind::parse("0"), Some(PatternKind::Regex));
        assert_eq!(PatternKind::parse(" 1 "), Some(PatternKind::Literal));
        assert_eq!(PatternKind::parse("FIXED"), Some(PatternKind::Literal));
        assert_eq!(PatternKind::parse("re"), Some(PatternKind::Regex));
        assert_eq!(PatternKind::parse("2"), None);
        assert_eq!(PatternKind::parse("glob"), None);
    }

    #[test]
    fn test_row_from_fields_truncates_extra() {
        let row = RuleRow::from_fields(&["a", "b", "1", "extra"], None).unwrap();
        assert_eq!(row.search_pattern.as_deref(), Some("a"));
        assert_eq!(row.replace_pattern.as_deref(), Some("b"));
        assert_eq!(row.kind, Some(PatternKind::Literal));
        assert_eq!(row.comment, None);
    }

    #[test]
    fn test_row_from_fields_rejects_bad_kind() {
        assert!(RuleRow::from_fields(&["a", "b", "x"], None).is_err());
    }

    #[test]
    fn test_row_from_yaml_mapping() {
        let value: Value =
            serde_yaml::from_str("{search_pat: foo, replace_pat: bar, type: 1, comment: hi}")
                .unwrap();
        let row = RuleRow::from_yaml(&value).unwrap();
        assert_eq!(row.search_pattern.as_deref(), Some("foo"));
        assert_eq!(row.kind, Some(PatternKind::Literal));
        assert_eq!(row.comment.as_deref(), Some("hi"));
    }

    #[test]
    fn test_row_from_yaml_unknown_field() {
        let value: Value = serde_yaml::from_str("{search_pat: foo, colour: red}").unwrap();
        assert!(RuleRow::from_yaml(&value).is_err());
    }

    #[test]
    fn test_mapping_entry_with_sequence_value() {
        let value: Value = serde_yaml::from_str("[bar, 1, note]").unwrap();
        let row = RuleRow::from_mapping_entry("foo", &value).unwrap();
        assert_eq!(row.search_pattern.as_deref(), Some("foo"));
        assert_eq!(row.replace_pattern.as_deref(), Some("bar"));
        assert_eq!(row.kind, Some(PatternKind::Literal));
        assert_eq!(row.comment.as_deref(), Some("note"));
    }

    #[test]
    fn test_build_operation_uses_defaults() {
        let defaults = RowDefaults {
            replace_pattern: "-".to_string(),
            kind: PatternKind::Literal,
            comment: Some("default".to_string()),
        };
        let row = RuleRow {
            search_pattern: Some("+".to_string()),
            ..Default::default()
        };
        let op = build_operation(row, &defaults).unwrap();
        assert_eq!(op.replace_pattern(), "-");
        assert_eq!(op.kind(), PatternKind::Literal);
        assert_eq!(op.comment(), Some("default"));
        assert_eq!(op.apply("1+1").unwrap(), "1-1");
    }

    #[test]
    fn test_row_kind_overrides_default() {
        let defaults = RowDefaults {
            kind: PatternKind::Literal,
            ..Default::default()
        };
        let row = RuleRow::from_fields(&["a+", "b", "0"], None).unwrap();
        let op = build_operation(row, &defaults).unwrap();
        assert_eq!(op.kind(), PatternKind::Regex);
        assert_eq!(op.apply("aaa").unwrap(), "b");
    }
}
