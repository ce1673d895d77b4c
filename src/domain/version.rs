use crate::domain::prerelease::PreReleaseTag;
use crate::error::{Result, VersionerError};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn version_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<major>\d+)(?:\.(?P<minor>\d+))?(?:\.(?P<patch>\d+))?(?:\.(?P<fourth>\d+))?(?:-(?P<pre>[0-9A-Za-z\-\.]+))?(?:\+(?P<build>[0-9A-Za-z\-\.]+))?$",
        )
        .ok()
    })
    .as_ref()
}

/// The semantic version field to increment
///
/// Ordered by significance so that `max` picks the most significant bump.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum VersionField {
    #[default]
    None,
    Patch,
    Minor,
    Major,
}

impl fmt::Display for VersionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VersionField::None => "None",
            VersionField::Patch => "Patch",
            VersionField::Minor => "Minor",
            VersionField::Major => "Major",
        };
        write!(f, "{}", name)
    }
}

/// Build metadata attached to a computed version
///
/// Excluded from precedence and equality.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildMetadata {
    pub commits_since_version_source: u64,
    pub branch: Option<String>,
    pub sha: Option<String>,
    pub short_sha: Option<String>,
    pub commit_date: Option<DateTime<Utc>>,
    pub version_source_sha: Option<String>,
    pub uncommitted_changes: u64,
}

/// Semantic version with optional pre-release tag and build metadata
///
/// Equality and ordering follow SemVer precedence: the numeric triple, then
/// the pre-release tag (a release outranks any pre-release of the same
/// triple). Build metadata never takes part.
#[derive(Debug, Clone, Default)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre_release: Option<PreReleaseTag>,
    pub build: BuildMetadata,
}

impl SemanticVersion {
    /// Create a release version without pre-release or metadata
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        SemanticVersion {
            major,
            minor,
            patch,
            pre_release: None,
            build: BuildMetadata::default(),
        }
    }

    /// Parse a version string (e.g., "1.2.3", "1.2", "1.2.3-beta.4+5")
    ///
    /// Missing minor/patch components default to zero and a fourth numeric
    /// component is accepted and dropped.
    pub fn parse(input: &str) -> Result<Self> {
        let captures = version_regex()
            .and_then(|re| re.captures(input.trim()))
            .ok_or_else(|| {
                VersionerError::version(format!("Invalid version format: '{}'", input))
            })?;

        let number = |name: &str| -> Result<u64> {
            match captures.name(name) {
                Some(m) => m.as_str().parse::<u64>().map_err(|_| {
                    VersionerError::version(format!("Invalid {} version: {}", name, m.as_str()))
                }),
                None => Ok(0),
            }
        };

        let pre_release = match captures.name("pre") {
            Some(m) => Some(PreReleaseTag::parse(m.as_str())?),
            None => None,
        };

        Ok(SemanticVersion {
            major: number("major")?,
            minor: number("minor")?,
            patch: number("patch")?,
            pre_release,
            build: BuildMetadata::default(),
        })
    }

    /// Parse a tag name after stripping a prefix matched by `prefix_pattern`
    ///
    /// The prefix is optional so that both `v1.2.3` and `1.2.3` parse under
    /// the default `[vV]` pattern; anything else in front of the version makes
    /// the tag unparsable.
    pub fn parse_with_prefix(input: &str, prefix: &Regex) -> Option<Self> {
        let remainder = match prefix.find(input) {
            Some(m) if m.start() == 0 => &input[m.end()..],
            _ => input,
        };
        SemanticVersion::parse(remainder).ok()
    }

    /// True when the version carries a pre-release tag
    pub fn is_pre_release(&self) -> bool {
        self.pre_release.as_ref().is_some_and(PreReleaseTag::has_tag)
    }

    /// Returns the same version stripped of pre-release and metadata
    pub fn to_release(&self) -> Self {
        SemanticVersion::new(self.major, self.minor, self.patch)
    }

    /// Returns a copy with the given pre-release tag
    pub fn with_pre_release(&self, tag: Option<PreReleaseTag>) -> Self {
        SemanticVersion {
            pre_release: tag,
            ..self.clone()
        }
    }

    /// Returns a copy with the given build metadata
    pub fn with_build(&self, build: BuildMetadata) -> Self {
        SemanticVersion {
            build,
            ..self.clone()
        }
    }

    /// Bump the version by a single field
    ///
    /// - **Major**: major += 1, minor = 0, patch = 0
    /// - **Minor**: minor += 1, patch = 0
    /// - **Patch**: patch += 1
    /// - **None**: unchanged
    ///
    /// A pre-release only advances its number instead (and stays put when it
    /// has none): the release it is heading towards has not shipped yet.
    /// Fails when a component would overflow.
    pub fn increment(&self, field: VersionField) -> Result<Self> {
        if let Some(tag) = self.pre_release.as_ref().filter(|t| t.has_tag()) {
            if tag.number.is_some() && field != VersionField::None {
                return Ok(self.with_pre_release(Some(tag.increment_number()?)));
            }
            return Ok(self.clone());
        }

        let mut next = self.clone();
        match field {
            VersionField::Major => {
                next.major = bumped(self.major, "major", self)?;
                next.minor = 0;
                next.patch = 0;
            }
            VersionField::Minor => {
                next.minor = bumped(self.minor, "minor", self)?;
                next.patch = 0;
            }
            VersionField::Patch => {
                next.patch = bumped(self.patch, "patch", self)?;
            }
            VersionField::None => {}
        }
        Ok(next)
    }

    /// The release reached by bumping `field`
    ///
    /// A pre-release first reaches its own release: `2.0.0-beta.1` bumped by
    /// any field is `2.0.0`. A `None` field leaves it as it is.
    pub fn bump_release(&self, field: VersionField) -> Result<Self> {
        if self.is_pre_release() {
            return Ok(match field {
                VersionField::None => self.clone(),
                _ => self.to_release(),
            });
        }
        self.to_release().increment(field)
    }

    /// `major.minor.patch`
    pub fn major_minor_patch(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

fn bumped(value: u64, component: &str, version: &SemanticVersion) -> Result<u64> {
    value.checked_add(1).ok_or_else(|| {
        VersionerError::version(format!(
            "Cannot increment the {} component of {}",
            component, version
        ))
    })
}

impl FromStr for SemanticVersion {
    type Err = VersionerError;

    fn from_str(s: &str) -> Result<Self> {
        SemanticVersion::parse(s)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(tag) = self.pre_release.as_ref().filter(|t| t.has_tag()) {
            write!(f, "-{}", tag)?;
        }
        Ok(())
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let own = self.pre_release.as_ref().filter(|t| t.has_tag());
        let theirs = other.pre_release.as_ref().filter(|t| t.has_tag());
        self.triple()
            .cmp(&other.triple())
            .then_with(|| match (own, theirs) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}
