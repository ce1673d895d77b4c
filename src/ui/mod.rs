//! User interface module - output selection and printing.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - Chooses a rendering and writes it out

pub mod formatter;

pub use formatter::{
    format_diagnostic, format_error, format_json, format_summary, format_text, format_toml,
};

use crate::calculator::VersionResult;
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::variables::VersionVariables;

/// How the variable set is written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Toml,
}

/// Render the requested output
///
/// With `show_variable` only that variable's value is rendered, whatever
/// the format; an unknown name is reported as a diagnostic.
pub fn render(
    variables: &VersionVariables,
    format: OutputFormat,
    show_variable: Option<&str>,
) -> Result<std::result::Result<String, Diagnostic>> {
    if let Some(name) = show_variable {
        return Ok(variables.require(name).map(str::to_string));
    }
    let rendered = match format {
        OutputFormat::Text => format_text(variables),
        OutputFormat::Json => format_json(variables)?,
        OutputFormat::Toml => format_toml(variables)?,
    };
    Ok(Ok(rendered))
}

pub fn display_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{}", format_diagnostic(diagnostic));
    }
}

pub fn display_error(message: &str) {
    eprintln!("{}", format_error(message));
}

/// One-line summary on stderr for interactive text output
pub fn display_summary(result: &VersionResult) {
    let branch = result.variables.get("BranchName").unwrap_or_default();
    let semver = result.variables.get("FullSemVer").unwrap_or_default();
    eprintln!("{}", format_summary(branch, semver, result.from_cache));
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn variables() -> VersionVariables {
        let mut map = IndexMap::new();
        map.insert("Major".to_string(), "3".to_string());
        VersionVariables::from_map(map)
    }

    #[test]
    fn test_single_variable_ignores_format() {
        let out = render(&variables(), OutputFormat::Json, Some("Major")).unwrap();
        assert_eq!(out, Ok("3".to_string()));
    }

    #[test]
    fn test_unknown_variable() {
        let out = render(&variables(), OutputFormat::Text, Some("Minor")).unwrap();
        assert_eq!(
            out,
            Err(Diagnostic::UnknownVariable {
                name: "Minor".to_string()
            })
        );
    }

    #[test]
    fn test_text_output() {
        let out = render(&variables(), OutputFormat::Text, None).unwrap();
        assert_eq!(out, Ok("Major: 3".to_string()));
    }
}
