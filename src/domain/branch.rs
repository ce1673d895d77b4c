use crate::domain::tag::TagPrefix;
use crate::domain::version::SemanticVersion;
use regex::Regex;
use std::fmt;

const REMOTE_PREFIXES: [&str; 3] = ["refs/heads/", "refs/remotes/", "origin/"];

/// A branch name with the helpers the version pipeline needs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchName(String);

impl BranchName {
    pub fn new(name: impl Into<String>) -> Self {
        BranchName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name without `refs/heads/`, `refs/remotes/` or `origin/` in front
    pub fn friendly(&self) -> &str {
        let mut name = self.0.as_str();
        for prefix in REMOTE_PREFIXES {
            if let Some(rest) = name.strip_prefix(prefix) {
                name = rest;
            }
        }
        name
    }

    /// Friendly name with every character outside `[0-9A-Za-z-]` replaced by `-`
    pub fn escaped(&self) -> String {
        escape_identifier(self.friendly())
    }

    /// Version embedded in the name (`release/2.0.0`, `release-1.3`)
    ///
    /// Only segments containing a dot qualify, which keeps ticket numbers such
    /// as `feature/JIRA-123` from reading as `123.0.0`.
    pub fn embedded_version(&self, prefix: &TagPrefix) -> Option<SemanticVersion> {
        self.friendly()
            .split(['/', '-'])
            .filter(|segment| segment.contains('.'))
            .find_map(|segment| prefix.parse(segment))
    }

    /// The part of the name left after removing what `pattern` matched
    ///
    /// `feature/login` with `^features?[/-]` gives `login`.
    pub fn without_pattern(&self, pattern: &Regex) -> String {
        let friendly = self.friendly();
        let stripped = pattern.replace(friendly, "");
        if stripped.is_empty() {
            friendly.to_string()
        } else {
            stripped.into_owned()
        }
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BranchName {
    fn from(name: &str) -> Self {
        BranchName::new(name)
    }
}

/// Replace characters that are not valid in a semver identifier with `-`
pub fn escape_identifier(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix() -> TagPrefix {
        TagPrefix::new("[vV]").unwrap()
    }

    #[test]
    fn test_friendly_name() {
        assert_eq!(BranchName::new("refs/heads/main").friendly(), "main");
        assert_eq!(BranchName::new("origin/release/1.0").friendly(), "release/1.0");
        assert_eq!(BranchName::new("develop").friendly(), "develop");
    }

    #[test]
    fn test_escaped_name() {
        assert_eq!(BranchName::new("feature/my_thing").escaped(), "feature-my-thing");
    }

    #[test]
    fn test_embedded_version() {
        let version = BranchName::new("release-2.0.0").embedded_version(&prefix());
        assert_eq!(version, Some(SemanticVersion::new(2, 0, 0)));

        let version = BranchName::new("release/v1.3").embedded_version(&prefix());
        assert_eq!(version, Some(SemanticVersion::new(1, 3, 0)));
    }

    #[test]
    fn test_ticket_numbers_are_not_versions() {
        assert_eq!(BranchName::new("feature/JIRA-123").embedded_version(&prefix()), None);
        assert_eq!(BranchName::new("main").embedded_version(&prefix()), None);
    }

    #[test]
    fn test_without_pattern() {
        let pattern = Regex::new("^features?[/-]").unwrap();
        assert_eq!(BranchName::new("feature/login").without_pattern(&pattern), "login");
        assert_eq!(BranchName::new("hotfix").without_pattern(&pattern), "hotfix");
    }
}
