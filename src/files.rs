//! File processing around the core: default directives per input type,
//! output file naming, and read-transform-write of a single file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{DirectiveError, Result};
use crate::transformation::Transformation;

/// Directive used when the input type has no default of its own.
pub const DEFAULT_TEXT_DIRECTIVE: &str = "default_txt";

/// Default output name template: `notes.txt` becomes `notes.out.txt`.
pub const DEFAULT_OUTPUT_FORMAT: &str = "{fnroot}.out{fnext}";

/// Default directive names for an input file, chosen by its extension.
pub fn default_directives_for(input: &Path) -> Vec<String> {
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let directive = match ext.as_str() {
        "txt" => DEFAULT_TEXT_DIRECTIVE,
        "tex" => "default_tex",
        "html" => "default_html",
        "rtf" => "default_rtf",
        _ => {
            info!(
                input = %input.display(),
                directive = DEFAULT_TEXT_DIRECTIVE,
                "Could not determine directive from file extension; using default"
            );
            return vec![DEFAULT_TEXT_DIRECTIVE.to_string()];
        }
    };

    info!(directive, extension = %ext, "Using directive based on input file extension");
    vec![directive.to_string()]
}

/// Output file name template.
///
/// Placeholders: `{inputfile}`, `{fnroot}`, `{fnext}`, `{fnbasename}`,
/// `{fndir}`, `{fnbase_noext}`, `{cwd}`. `{{` and `}}` are literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNameFormat(String);

impl OutputNameFormat {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn template(&self) -> &str {
        &self.0
    }

    /// Render the output path for `input`.
    pub fn render(&self, input: &Path) -> Result<PathBuf> {
        let inputfile = input.to_string_lossy().into_owned();
        let fnext = input
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let fnroot = inputfile
            .strip_suffix(fnext.as_str())
            .unwrap_or(&inputfile)
            .to_string();
        let fnbasename = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fnbase_noext = Path::new(&fnroot)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fndir = input
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut out = String::with_capacity(self.0.len() + inputfile.len());
        let mut chars = self.0.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut key = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => key.push(ch),
                            None => {
                                return Err(DirectiveError::Template(format!(
                                    "unterminated placeholder in '{}'",
                                    self.0
                                )))
                            }
                        }
                    }
                    let value = match key.as_str() {
                        "inputfile" => inputfile.clone(),
                        "fnroot" => fnroot.clone(),
                        "fnext" => fnext.clone(),
                        "fnbasename" => fnbasename.clone(),
                        "fnbase_noext" => fnbase_noext.clone(),
                        "fndir" => fndir.clone(),
                        "cwd" => env::current_dir()
                            .map_err(|e| DirectiveError::io(".", e))?
                            .to_string_lossy()
                            .into_owned(),
                        other => {
                            return Err(DirectiveError::Template(format!(
                                "unknown placeholder '{{{}}}'",
                                other
                            )))
                        }
                    };
                    out.push_str(&value);
                }
                '}' => {
                    return Err(DirectiveError::Template(format!(
                        "single '}}' in '{}'",
                        self.0
                    )))
                }
                other => out.push(other),
            }
        }

        Ok(PathBuf::from(out))
    }
}

impl Default for OutputNameFormat {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_FORMAT)
    }
}

/// Read `input` as UTF-8, transform it, and write the result.
///
/// Returns the output path.
pub fn process_file(
    input: &Path,
    transformation: &dyn Transformation,
    output_format: &OutputNameFormat,
) -> Result<PathBuf> {
    info!(input = %input.display(), "Reading file");
    let content = fs::read_to_string(input).map_err(|e| DirectiveError::io(input, e))?;

    let content = transformation.transform(&content)?;

    let output = output_format.render(input)?;
    info!(output = %output.display(), "Writing file");
    fs::write(&output, content).map_err(|e| DirectiveError::io(&output, e))?;
    Ok(output)
}
