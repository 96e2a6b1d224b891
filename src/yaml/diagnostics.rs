//! Source-annotated diagnostics for inventory files
//!
//! Used by `sshinv check` to point at the offending line of a broken file
//! instead of printing a bare parser message.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// YAML syntax error with source location
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(sshinv::yaml::syntax))]
pub struct YamlSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    message: String,
}

impl YamlSyntaxError {
    pub fn at_location(
        message: impl Into<String>,
        source: &str,
        filename: &str,
        line: usize,
        column: usize,
        help: Option<String>,
    ) -> Self {
        let offset = line_col_to_offset(source, line, column);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Check that every document in a file is well-formed YAML
///
/// Only syntax is checked here. Error locations are reported relative to the
/// whole file, not to the failing document.
pub fn check_syntax(source: &str, filename: &str) -> Result<(), YamlSyntaxError> {
    let mut document = String::new();
    let mut first_line = 1;

    for (index, line) in source.lines().enumerate() {
        if line.starts_with("---") {
            check_document(&document, first_line, source, filename)?;
            document.clear();
            first_line = index + 2;
            continue;
        }
        document.push_str(line);
        document.push('\n');
    }
    check_document(&document, first_line, source, filename)
}

fn check_document(
    document: &str,
    first_line: usize,
    source: &str,
    filename: &str,
) -> Result<(), YamlSyntaxError> {
    if document.trim().is_empty() {
        return Ok(());
    }
    match serde_yml::from_str::<serde_yml::Value>(document) {
        Ok(_) => Ok(()),
        Err(err) => {
            let (line, column) = err
                .location()
                .map(|loc| (loc.line(), loc.column()))
                .unwrap_or((1, 1));
            let message = err.to_string();
            let help = generate_help(&message);
            Err(YamlSyntaxError::at_location(
                message,
                source,
                filename,
                (first_line + line).saturating_sub(1),
                column,
                help,
            ))
        }
    }
}

/// Convert a 1-based line/column pair to a byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut line_start = 0;
    for (index, text) in source.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            let within = text
                .char_indices()
                .nth(column.saturating_sub(1))
                .map(|(i, _)| i)
                .unwrap_or(text.len().saturating_sub(1));
            return line_start + within;
        }
        line_start += text.len();
    }
    source.len().saturating_sub(1)
}

fn generate_help(message: &str) -> Option<String> {
    let msg = message.to_lowercase();

    if msg.contains("tab") {
        return Some("Indent with spaces; YAML does not allow tabs.".to_string());
    }
    if msg.contains("duplicate") {
        return Some("Each key may appear once per document.".to_string());
    }
    if msg.contains("mapping values are not allowed") {
        return Some("Add a space after ':' or quote values that contain ':'.".to_string());
    }
    if msg.contains("did not find expected") || msg.contains("expected block end") {
        return Some("Check the indentation and closing brackets around this line.".to_string());
    }
    if msg.contains("invalid type") || msg.contains("invalid value") {
        return Some("Ports are numbers; tags and host_ids are lists.".to_string());
    }

    None
}
