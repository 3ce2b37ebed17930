//! Built-in LaTeX-to-text directive.
//!
//! Expands the macros that matter when a document is read aloud (sectioning,
//! units, Greek letters, escaped specials), drops citations, figures,
//! comments and math delimiters, and keeps the text of everything else.

use tracing::debug;

use crate::error::{DirectiveError, Result};
use crate::registry::DirectiveRegistry;

/// Name the LaTeX directive is registered under.
pub const LATEX_DIRECTIVE: &str = "latex_to_text";

/// Alternate name kept for rule sets written against older tooling.
pub const LATEX_DIRECTIVE_ALIAS: &str = "pylatexenc";

const GREEK: [&str; 24] = [
    "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
    "lambda", "mu", "nu", "xi", "omicron", "pi", "rho", "sigma", "tau", "upsilon", "phi", "chi",
    "psi", "omega",
];

/// Register the LaTeX directive under both of its names.
pub fn register_builtins(registry: &mut DirectiveRegistry) {
    registry.register_function(LATEX_DIRECTIVE, latex_to_text);
    registry.register_function(LATEX_DIRECTIVE_ALIAS, latex_to_text);
}

/// Convert LaTeX source to plain text for speech.
///
/// # Errors
///
/// `Transform` if braces or optional-argument brackets are unbalanced.
pub fn latex_to_text(tex: &str) -> Result<String> {
    let mut converter = Converter {
        chars: tex.chars().collect(),
        pos: 0,
    };
    converter.convert_until(None)
}

enum MacroRule {
    /// Drop the macro with its optional and first required argument.
    Discard,
    /// Fill `{}` slots in the template with the converted arguments.
    Format {
        template: &'static str,
        args: usize,
    },
    /// Replace the macro by fixed text.
    Word(&'static str),
}

fn macro_rule(name: &str) -> Option<MacroRule> {
    let rule = match name {
        "includegraphics" | "cite" | "footnote" | "label" | "begin" | "end" => MacroRule::Discard,
        "chapter" => MacroRule::Format {
            template: "\n\nChapter: {}\n",
            args: 1,
        },
        "section" => MacroRule::Format {
            template: "\nSection: {}\n",
            args: 1,
        },
        "subsection" | "subsubsection" => MacroRule::Format {
            template: "\n{}:\n",
            args: 1,
        },
        "paragraph" => MacroRule::Format {
            template: "\n{}:",
            args: 1,
        },
        "caption" => MacroRule::Format {
            template: "\nCaption: {}\n",
            args: 1,
        },
        "epigraph" => MacroRule::Format {
            template: "\nQuote: {}\n",
            args: 1,
        },
        "autoref" => MacroRule::Format {
            template: "see reference: ",
            args: 1,
        },
        "SI" => MacroRule::Format {
            template: "{} {}",
            args: 2,
        },
        "SIrange" => MacroRule::Format {
            template: "from {} to {} ",
            args: 2,
        },
        "%" | "percent" => MacroRule::Word("percent"),
        "prime" => MacroRule::Word("prime"),
        "degree" => MacroRule::Word("degree"),
        "ldots" | "dots" => MacroRule::Word("..."),
        "&" => MacroRule::Word("&"),
        "$" => MacroRule::Word("$"),
        "_" => MacroRule::Word("_"),
        "#" => MacroRule::Word("#"),
        "{" => MacroRule::Word("{"),
        "}" => MacroRule::Word("}"),
        "\\" => MacroRule::Word("\n"),
        " " | "," | ";" => MacroRule::Word(" "),
        other => return GREEK.iter().copied().find(|g| *g == other).map(MacroRule::Word),
    };
    Some(rule)
}

struct Converter {
    chars: Vec<char>,
    pos: usize,
}

impl Converter {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> DirectiveError {
        DirectiveError::Transform {
            directive: LATEX_DIRECTIVE.to_string(),
            message: format!("{} (at character {})", message.into(), self.pos),
        }
    }

    /// Convert up to `closing` (consumed) or end of input.
    fn convert_until(&mut self, closing: Option<char>) -> Result<String> {
        let mut out = String::new();
        loop {
            let Some(c) = self.next() else {
                return match closing {
                    Some(closing) => Err(self.error(format!("missing '{}'", closing))),
                    None => Ok(out),
                };
            };
            match c {
                c if Some(c) == closing => return Ok(out),
                '}' => return Err(self.error("unbalanced '}'")),
                '{' => out.push_str(&self.convert_until(Some('}'))?),
                '%' => {
                    while let Some(c) = self.next() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                '~' => out.push(' '),
                '$' => {}
                '\\' => self.convert_macro(&mut out)?,
                other => out.push(other),
            }
        }
    }

    fn convert_macro(&mut self, out: &mut String) -> Result<()> {
        let name = match self.next() {
            Some(c) if c.is_ascii_alphabetic() => {
                let mut name = String::from(c);
                while let Some(c) = self.peek().filter(char::is_ascii_alphabetic) {
                    name.push(c);
                    self.pos += 1;
                }
                if self.peek() == Some('*') {
                    self.pos += 1;
                }
                name
            }
            Some(c) => c.to_string(),
            None => return Ok(()),
        };

        match macro_rule(&name) {
            Some(MacroRule::Discard) => {
                self.skip_optional_arg()?;
                self.read_arg()?;
            }
            Some(MacroRule::Format { template, args }) => {
                self.skip_optional_arg()?;
                let mut values = Vec::with_capacity(args);
                for _ in 0..args {
                    values.push(self.read_arg()?.unwrap_or_default());
                }
                fill(template, &values, out);
            }
            Some(MacroRule::Word(word)) => out.push_str(word),
            None => debug!(name = %name, "Dropping unknown LaTeX macro"),
        }
        Ok(())
    }

    fn skip_optional_arg(&mut self) -> Result<()> {
        if self.peek() == Some('[') {
            self.pos += 1;
            self.convert_until(Some(']'))?;
        }
        Ok(())
    }

    /// Read one braced argument, or a single character argument.
    fn read_arg(&mut self) -> Result<Option<String>> {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        match self.peek() {
            Some('{') => {
                self.pos += 1;
                self.convert_until(Some('}')).map(Some)
            }
            Some(c) if c.is_alphanumeric() => {
                self.pos += 1;
                Ok(Some(c.to_string()))
            }
            _ => {
                self.pos = start;
                Ok(None)
            }
        }
    }
}

fn fill(template: &str, values: &[String], out: &mut String) {
    let mut values = values.iter();
    let mut pieces = template.split("{}").peekable();
    while let Some(piece) = pieces.next() {
        out.push_str(piece);
        if pieces.peek().is_some() {
            if let Some(value) = values.next() {
                out.push_str(value);
            }
        }
    }
}
