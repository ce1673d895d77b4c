use crate::domain::version::SemanticVersion;
use crate::error::Result;
use git2::Oid;
use regex::Regex;

/// A tag whose name parsed as a version under the configured prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag {
    pub name: String,
    pub version: SemanticVersion,
    pub commit: Oid,
}

/// Tag prefix pattern (e.g., "[vV]", "release-")
///
/// The prefix is a regular expression matched at the start of the tag name.
#[derive(Debug, Clone)]
pub struct TagPrefix {
    pattern: String,
    regex: Regex,
}

impl TagPrefix {
    /// Compile a tag prefix pattern
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let regex = Regex::new(&format!("^(?:{})", pattern))?;
        Ok(TagPrefix { pattern, regex })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Parse a tag name as a version, `None` when it does not carry one
    pub fn parse(&self, tag_name: &str) -> Option<SemanticVersion> {
        SemanticVersion::parse_with_prefix(tag_name, &self.regex)
    }

    /// Parse a tag into a [`VersionTag`] pointing at `commit`
    pub fn version_tag(&self, tag_name: &str, commit: Oid) -> Option<VersionTag> {
        self.parse(tag_name).map(|version| VersionTag {
            name: tag_name.to_string(),
            version,
            commit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_with_prefix() {
        let prefix = TagPrefix::new("v").unwrap();
        assert_eq!(prefix.parse("v1.2.3"), Some(SemanticVersion::new(1, 2, 3)));
    }

    #[test]
    fn test_tag_without_matching_prefix_is_ignored() {
        let prefix = TagPrefix::new("v").unwrap();
        assert_eq!(prefix.parse("release-1.2.3"), None);
        assert_eq!(prefix.parse("nightly"), None);
    }

    #[test]
    fn test_custom_prefix() {
        let prefix = TagPrefix::new("release-").unwrap();
        assert_eq!(prefix.parse("release-2.0.0"), Some(SemanticVersion::new(2, 0, 0)));
    }

    #[test]
    fn test_default_prefix_accepts_bare_versions() {
        let prefix = TagPrefix::new("[vV]").unwrap();
        assert_eq!(prefix.parse("1.0.3"), Some(SemanticVersion::new(1, 0, 3)));
        assert_eq!(prefix.parse("V2.0"), Some(SemanticVersion::new(2, 0, 0)));
    }

    #[test]
    fn test_invalid_prefix_pattern() {
        assert!(TagPrefix::new("[v").is_err());
    }

    #[test]
    fn test_version_tag() {
        let oid = Oid::from_bytes(&[3; 20]).unwrap();
        let tag = TagPrefix::new("[vV]").unwrap().version_tag("v1.0.0-rc.1", oid).unwrap();
        assert_eq!(tag.version.to_string(), "1.0.0-rc.1");
        assert_eq!(tag.commit, oid);
    }
}
