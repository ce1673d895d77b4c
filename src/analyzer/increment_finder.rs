use crate::config::{CommitMessageIncrementing, EffectiveConfiguration, IncrementMode};
use crate::domain::{BranchName, ConventionalCommit, TagPrefix, VersionField};
use crate::error::Result;
use crate::git::{Commit, RepositoryGraph};
use crate::strategies::BaseVersion;
use regex::Regex;
use tracing::debug;

/// Decides which version field a range of commits bumps
pub struct IncrementStrategyFinder {
    major: Regex,
    minor: Regex,
    patch: Regex,
    none: Regex,
    default_field: VersionField,
    increment_mode: IncrementMode,
    incrementing: CommitMessageIncrementing,
    semver_markers: bool,
    conventional_commits: bool,
    /// Release branch named after its version; its commits never bump
    versioned_branch: bool,
}

fn case_insensitive(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("(?i){}", pattern))?)
}

impl IncrementStrategyFinder {
    pub fn new(config: &EffectiveConfiguration, branch: &BranchName, prefix: &TagPrefix) -> Result<Self> {
        Ok(IncrementStrategyFinder {
            major: case_insensitive(&config.major_version_bump_message)?,
            minor: case_insensitive(&config.minor_version_bump_message)?,
            patch: case_insensitive(&config.patch_version_bump_message)?,
            none: case_insensitive(&config.no_bump_message)?,
            default_field: config.increment,
            increment_mode: config.increment_mode,
            incrementing: config.commit_message_incrementing,
            semver_markers: config.uses_semver_markers(),
            conventional_commits: config.uses_conventional_commits(),
            versioned_branch: config.is_release_branch && branch.embedded_version(prefix).is_some(),
        })
    }

    pub fn default_field(&self) -> VersionField {
        self.default_field
    }

    /// Bump marker in a single message, most significant marker first
    ///
    /// `Some(VersionField::None)` is an explicit "no bump" marker.
    pub fn marker(&self, message: &str) -> Option<VersionField> {
        if self.semver_markers {
            let markers = [
                (&self.major, VersionField::Major),
                (&self.minor, VersionField::Minor),
                (&self.patch, VersionField::Patch),
                (&self.none, VersionField::None),
            ];
            if let Some((_, field)) = markers.iter().find(|(re, _)| re.is_match(message)) {
                return Some(*field);
            }
        }
        if self.conventional_commits {
            return ConventionalCommit::parse(message).and_then(|c| c.version_field());
        }
        None
    }

    fn scanned<'c>(&self, commits: &'c [Commit]) -> Vec<&'c Commit> {
        match self.incrementing {
            CommitMessageIncrementing::Disabled => Vec::new(),
            CommitMessageIncrementing::MergeMessageOnly => {
                commits.iter().filter(|c| c.is_merge()).collect()
            }
            CommitMessageIncrementing::Enabled => commits.iter().collect(),
        }
    }

    /// Field bumped by `commits` as a whole
    pub fn field_for_commits(&self, commits: &[Commit]) -> VersionField {
        if self.versioned_branch {
            return VersionField::None;
        }
        if self.incrementing == CommitMessageIncrementing::Disabled {
            return self.default_field;
        }

        let scanned = self.scanned(commits);
        match self.increment_mode {
            IncrementMode::PerCommit => scanned
                .iter()
                .map(|c| self.field_for_commit(c))
                .max()
                .unwrap_or(self.default_field),
            IncrementMode::PerTag => {
                let markers: Vec<VersionField> =
                    scanned.iter().filter_map(|c| self.marker(&c.message)).collect();
                if markers.is_empty() {
                    return self.default_field;
                }
                // "no bump" holds only while every scanned commit asks for it
                let all_no_bump = markers.len() == scanned.len()
                    && markers.iter().all(|f| *f == VersionField::None);
                if all_no_bump {
                    return VersionField::None;
                }
                markers
                    .into_iter()
                    .max()
                    .map_or(self.default_field, |highest| highest.max(self.default_field))
            }
        }
    }

    /// Field a single commit bumps on its own: its marker, but never less
    /// than the default unless it says "no bump"
    pub fn field_for_commit(&self, commit: &Commit) -> VersionField {
        match self.marker(&commit.message) {
            Some(VersionField::None) => VersionField::None,
            Some(field) => field.max(self.default_field),
            None => self.default_field,
        }
    }

    /// Field to bump `candidate` by, from the commits after its source up
    /// to `tip`
    ///
    /// Pre-1.0 versions never take a major bump from messages; breaking
    /// changes there bump the minor version.
    pub fn determine(
        &self,
        repo: &dyn RepositoryGraph,
        candidate: &BaseVersion,
        tip: &Commit,
    ) -> Result<VersionField> {
        let source = candidate.source_commit.as_ref().map(|c| c.id);
        let commits = repo.commits_reachable(tip.id, source)?;
        let mut field = self.field_for_commits(&commits);
        if candidate.version.major == 0 && field == VersionField::Major {
            field = VersionField::Minor;
        }
        debug!(candidate = %candidate.source, commits = commits.len(), %field, "determined increment");
        Ok(field)
    }
}
