//! Pure formatting functions for command output.
//!
//! Everything here returns strings; printing happens in the parent module.

use console::style;

use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::variables::VersionVariables;

/// Variables as `Name: value` lines with aligned values
pub fn format_text(variables: &VersionVariables) -> String {
    let width = variables.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    variables
        .iter()
        .map(|(name, value)| format!("{:width$}: {}", name, value, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Variables as a pretty-printed JSON object, keys in canonical order
pub fn format_json(variables: &VersionVariables) -> Result<String> {
    Ok(serde_json::to_string_pretty(variables)?)
}

/// Variables as a flat TOML document
pub fn format_toml(variables: &VersionVariables) -> Result<String> {
    Ok(toml::to_string(variables)?)
}

/// A diagnostic as a one-line, yellow warning
pub fn format_diagnostic(diagnostic: &Diagnostic) -> String {
    format!("{} {}", style("⚠ WARNING:").yellow(), diagnostic)
}

pub fn format_error(message: &str) -> String {
    format!("{} {}", style("ERROR:").red(), message)
}

/// Header line naming the branch and the resolved version
pub fn format_summary(branch: &str, semver: &str, from_cache: bool) -> String {
    let origin = if from_cache { " (cached)" } else { "" };
    format!(
        "{} {} on {}{}",
        style("→").yellow(),
        style(semver).green().bold(),
        style(branch).cyan(),
        origin
    )
}
