use serde::{Deserialize, Serialize};
use std::fmt;

/// Recoverable conditions met while computing a version.
/// These never abort the computation and should be reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Diagnostic {
    /// No version tag anywhere in history; the fallback version was used
    NoTagsFound { fallback: String },
    /// A base version candidate was removed by an ignore rule
    CandidateExcluded { source: String, reasons: Vec<String> },
    /// A requested output variable does not exist
    UnknownVariable { name: String },
    /// The result could not be written to the cache
    CacheWriteFailed { path: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NoTagsFound { fallback } => {
                write!(f, "No version tags found, falling back to {}", fallback)
            }
            Diagnostic::CandidateExcluded { source, reasons } => {
                write!(f, "Ignoring candidate '{}': {}", source, reasons.join("; "))
            }
            Diagnostic::UnknownVariable { name } => {
                write!(f, "Unknown variable '{}'", name)
            }
            Diagnostic::CacheWriteFailed { path, reason } => {
                write!(f, "Could not write cache entry '{}': {}", path, reason)
            }
        }
    }
}
