//! Pre-release tag handling for semantic versions
//!
//! A pre-release tag is a label with an optional numeric suffix ("beta.4",
//! "alpha", "PullRequest12.1"). Precedence follows semver.org item 11 and is
//! delegated to the `semver` crate once the tag is rendered.

use crate::error::{Result, VersionerError};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn prerelease_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<name>.*?)(?:\.(?P<number>\d+))?$").ok())
        .as_ref()
}

/// Pre-release part of a semantic version
///
/// # Examples
/// - "alpha" -> PreReleaseTag { name: "alpha", number: None }
/// - "beta.1" -> PreReleaseTag { name: "beta", number: Some(1) }
/// - "v2" -> PreReleaseTag { name: "v2", number: None }
/// - "7" -> PreReleaseTag { name: "", number: Some(7) }
///
/// Only a dot-separated trailing number is the counter, so every rendered
/// tag parses back to itself. Legacy renderings such as `beta4` are labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PreReleaseTag {
    /// The label, possibly empty when only a number was given
    pub name: String,
    /// Optional numeric suffix
    pub number: Option<u64>,
}

impl PreReleaseTag {
    pub fn new(name: impl Into<String>, number: Option<u64>) -> Self {
        PreReleaseTag {
            name: name.into(),
            number,
        }
    }

    /// Parse a pre-release tag from its rendered form
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(VersionerError::version("Empty pre-release tag"));
        }

        if s.bytes().all(|b| b.is_ascii_digit()) {
            let number = s.parse::<u64>().map_err(|_| {
                VersionerError::version(format!("Invalid pre-release number: '{}'", s))
            })?;
            return Ok(PreReleaseTag::new("", Some(number)));
        }

        let captures = prerelease_regex()
            .and_then(|re| re.captures(s))
            .ok_or_else(|| VersionerError::version(format!("Invalid pre-release tag: '{}'", s)))?;

        let name = captures
            .name("name")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let number = match captures.name("number") {
            Some(m) => Some(m.as_str().parse::<u64>().map_err(|_| {
                VersionerError::version(format!("Invalid pre-release number: '{}'", m.as_str()))
            })?),
            None => None,
        };

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(VersionerError::version(format!(
                "Invalid pre-release identifier: '{}'",
                s
            )));
        }

        Ok(PreReleaseTag { name, number })
    }

    /// True when the tag carries a label or a number
    pub fn has_tag(&self) -> bool {
        !self.name.is_empty() || self.number.is_some()
    }

    /// Whether this tag belongs to the given label (case-insensitive)
    pub fn matches_label(&self, label: &str) -> bool {
        self.name.eq_ignore_ascii_case(label)
    }

    /// Returns the next iteration: `beta.1` -> `beta.2`, `beta` -> `beta.1`
    pub fn increment_number(&self) -> Result<Self> {
        let number = match self.number {
            Some(n) => n.checked_add(1).ok_or_else(|| {
                VersionerError::version(format!("Pre-release number of '{}' overflows", self))
            })?,
            None => 1,
        };
        Ok(PreReleaseTag {
            name: self.name.clone(),
            number: Some(number),
        })
    }

    /// Legacy rendering without the dot separator: `beta1`
    pub fn to_legacy_string(&self) -> String {
        match self.number {
            Some(n) => format!("{}{}", self.name, n),
            None => self.name.clone(),
        }
    }

    /// Legacy rendering with the number padded to `pad` digits: `beta0001`
    pub fn to_legacy_padded_string(&self, pad: usize) -> String {
        match self.number {
            Some(n) => format!("{}{:0width$}", self.name, n, width = pad),
            None => self.name.clone(),
        }
    }

    fn precedence_key(&self) -> Option<semver::Prerelease> {
        semver::Prerelease::new(&self.to_string()).ok()
    }
}

impl FromStr for PreReleaseTag {
    type Err = VersionerError;

    fn from_str(s: &str) -> Result<Self> {
        PreReleaseTag::parse(s)
    }
}

impl fmt::Display for PreReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name.is_empty(), self.number) {
            (true, Some(n)) => write!(f, "{}", n),
            (false, Some(n)) => write!(f, "{}.{}", self.name, n),
            (_, None) => write!(f, "{}", self.name),
        }
    }
}

impl PartialOrd for PreReleaseTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PreReleaseTag {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.precedence_key(), other.precedence_key()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self
                .name
                .cmp(&other.name)
                .then_with(|| self.number.cmp(&other.number)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_number() {
        let tag = PreReleaseTag::parse("beta.1").unwrap();
        assert_eq!(tag.name, "beta");
        assert_eq!(tag.number, Some(1));
    }

    #[test]
    fn test_undotted_digits_stay_in_label() {
        let tag = PreReleaseTag::parse("beta4").unwrap();
        assert_eq!(tag, PreReleaseTag::new("beta4", None));
    }

    #[test]
    fn test_label_ending_in_digits_round_trips() {
        let tag = PreReleaseTag::new("v2", None);
        assert_eq!(tag.to_string(), "v2");
        let parsed = PreReleaseTag::parse(&tag.to_string()).unwrap();
        assert_eq!(parsed, tag);
        assert!(parsed.matches_label("v2"));

        let numbered = PreReleaseTag::new("v2", Some(3));
        assert_eq!(PreReleaseTag::parse(&numbered.to_string()).unwrap(), numbered);
    }

    #[test]
    fn test_dotted_label_keeps_dots() {
        let tag = PreReleaseTag::parse("PullRequest12.1").unwrap();
        assert_eq!(tag, PreReleaseTag::new("PullRequest12", Some(1)));
        let tag = PreReleaseTag::parse("rc.x").unwrap();
        assert_eq!(tag, PreReleaseTag::new("rc.x", None));
    }

    #[test]
    fn test_parse_label_only() {
        let tag = PreReleaseTag::parse("alpha").unwrap();
        assert_eq!(tag, PreReleaseTag::new("alpha", None));
    }

    #[test]
    fn test_parse_number_only() {
        let tag = PreReleaseTag::parse("7").unwrap();
        assert_eq!(tag, PreReleaseTag::new("", Some(7)));
        assert_eq!(tag.to_string(), "7");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(PreReleaseTag::parse("").is_err());
        assert!(PreReleaseTag::parse("beta_1!").is_err());
    }

    #[test]
    fn test_increment_number() {
        let tag = PreReleaseTag::new("beta", Some(1));
        assert_eq!(tag.increment_number().unwrap().number, Some(2));
        let tag = PreReleaseTag::new("beta", None);
        assert_eq!(tag.increment_number().unwrap().number, Some(1));
        assert!(PreReleaseTag::new("beta", Some(u64::MAX)).increment_number().is_err());
    }

    #[test]
    fn test_legacy_rendering() {
        let tag = PreReleaseTag::new("beta", Some(3));
        assert_eq!(tag.to_legacy_string(), "beta3");
        assert_eq!(tag.to_legacy_padded_string(4), "beta0003");
    }

    #[test]
    fn test_ordering_numeric_not_lexical() {
        let two = PreReleaseTag::new("beta", Some(2));
        let ten = PreReleaseTag::new("beta", Some(10));
        assert!(two < ten);
    }

    #[test]
    fn test_ordering_by_label() {
        let alpha = PreReleaseTag::new("alpha", Some(9));
        let beta = PreReleaseTag::new("beta", Some(1));
        assert!(alpha < beta);
    }

    #[test]
    fn test_matches_label_case_insensitive() {
        let tag = PreReleaseTag::new("Beta", Some(1));
        assert!(tag.matches_label("beta"));
        assert!(!tag.matches_label("alpha"));
    }
}
