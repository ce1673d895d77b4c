use crate::domain::version::VersionField;
use regex::Regex;
use std::sync::OnceLock;

fn header_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<type>[a-z]+)(?:\((?P<scope>[^)]+)\))?(?P<bang>!?):\s*(?P<description>.*)").ok())
        .as_ref()
}

const BREAKING_FOOTERS: [&str; 2] = ["BREAKING CHANGE:", "BREAKING-CHANGE:"];

/// Parsed representation of a conventional commit message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalCommit {
    pub r#type: String,
    pub scope: Option<String>,
    pub description: String,
    pub is_breaking_change: bool,
}

impl ConventionalCommit {
    /// Parse a Conventional Commits header
    ///
    /// Supports formats:
    /// - type(scope)!: description
    /// - type(scope): description
    /// - type!: description
    /// - type: description
    ///
    /// Returns `None` for messages that do not follow the convention.
    pub fn parse(message: &str) -> Option<Self> {
        let captures = header_regex().and_then(|re| re.captures(message))?;

        let r#type = captures
            .name("type")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let scope = captures.name("scope").map(|m| m.as_str().to_string());
        let has_exclamation = captures.name("bang").map(|m| m.as_str()) == Some("!");
        let description = captures
            .name("description")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let is_breaking_change =
            has_exclamation || BREAKING_FOOTERS.iter().any(|footer| message.contains(footer));

        Some(ConventionalCommit {
            r#type,
            scope,
            description,
            is_breaking_change,
        })
    }

    /// The version field this commit asks for, if any
    pub fn version_field(&self) -> Option<VersionField> {
        if self.is_breaking_change {
            return Some(VersionField::Major);
        }
        match self.r#type.as_str() {
            "feat" | "feature" => Some(VersionField::Minor),
            "fix" | "perf" => Some(VersionField::Patch),
            _ => None,
        }
    }
}
