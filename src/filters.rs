//! Ignore rules for base version candidates
//!
//! A filter either keeps a candidate or excludes it with a reason. Filters
//! compose by logical OR and every matching reason is kept. Candidates
//! without a source commit pass every filter.

use crate::config::IgnoreConfig;
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::strategies::BaseVersion;
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

#[derive(Debug, Clone)]
pub enum VersionFilter {
    /// Source commit sha starts with one of these, case-insensitively
    Sha(Vec<String>),
    /// Source commit is older than this
    MinimumDate(DateTime<Utc>),
    /// Source commit message matches one of these
    MessagePattern(Vec<Regex>),
}

impl VersionFilter {
    /// The reason `candidate` is excluded, `None` if it is kept
    pub fn exclude(&self, candidate: &BaseVersion) -> Option<String> {
        let commit = candidate.source_commit.as_ref()?;
        match self {
            VersionFilter::Sha(prefixes) => {
                let sha = commit.sha();
                prefixes
                    .iter()
                    .find(|p| !p.is_empty() && sha.starts_with(&p.to_ascii_lowercase()))
                    .map(|p| format!("source commit {} matches ignored sha '{}'", commit.short_sha(), p))
            }
            VersionFilter::MinimumDate(cutoff) => (commit.when < *cutoff).then(|| {
                format!(
                    "source commit {} dated {} is before {}",
                    commit.short_sha(),
                    commit.when.to_rfc3339(),
                    cutoff.to_rfc3339()
                )
            }),
            VersionFilter::MessagePattern(patterns) => patterns
                .iter()
                .find(|re| re.is_match(&commit.message))
                .map(|re| format!("source commit message matches '{}'", re.as_str())),
        }
    }
}

/// All configured filters
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<VersionFilter>,
}

impl FilterSet {
    pub fn new(filters: Vec<VersionFilter>) -> Self {
        FilterSet { filters }
    }

    pub fn from_config(ignore: &IgnoreConfig) -> Result<Self> {
        let mut filters = Vec::new();
        if !ignore.sha.is_empty() {
            filters.push(VersionFilter::Sha(ignore.sha.clone()));
        }
        if let Some(cutoff) = ignore.commits_before {
            filters.push(VersionFilter::MinimumDate(cutoff));
        }
        if !ignore.message_patterns.is_empty() {
            let patterns = ignore
                .message_patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            filters.push(VersionFilter::MessagePattern(patterns));
        }
        Ok(FilterSet { filters })
    }

    /// Every reason a filter gives for excluding `candidate`
    pub fn reasons(&self, candidate: &BaseVersion) -> Vec<String> {
        self.filters
            .iter()
            .filter_map(|f| f.exclude(candidate))
            .collect()
    }

    /// Keep the candidates no filter excludes, recording a diagnostic for
    /// each one removed
    pub fn apply(
        &self,
        candidates: Vec<BaseVersion>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<BaseVersion> {
        candidates
            .into_iter()
            .filter(|candidate| {
                let reasons = self.reasons(candidate);
                if reasons.is_empty() {
                    return true;
                }
                debug!(%candidate, ?reasons, "excluding base version");
                diagnostics.push(Diagnostic::CandidateExcluded {
                    source: candidate.source.clone(),
                    reasons,
                });
                false
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SemanticVersion;
    use crate::git::Commit;
    use chrono::TimeZone;
    use git2::Oid;

    fn candidate(message: &str, when: DateTime<Utc>) -> BaseVersion {
        let id = Oid::from_str("abcdef0123456789abcdef0123456789abcdef01").unwrap();
        BaseVersion::new(
            "Git tag 'v1.0.0'",
            true,
            SemanticVersion::new(1, 0, 0),
            Some(Commit {
                id,
                message: message.to_string(),
                when,
                parents: Vec::new(),
            }),
        )
    }

    fn date(year: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_sha_prefix_is_case_insensitive() {
        let filter = VersionFilter::Sha(vec!["ABCDEF".to_string()]);
        assert!(filter.exclude(&candidate("x", date(2024))).is_some());

        let other = VersionFilter::Sha(vec!["123".to_string()]);
        assert!(other.exclude(&candidate("x", date(2024))).is_none());
    }

    #[test]
    fn test_minimum_date() {
        let filter = VersionFilter::MinimumDate(date(2023));
        assert!(filter.exclude(&candidate("x", date(2022))).is_some());
        assert!(filter.exclude(&candidate("x", date(2024))).is_none());
    }

    #[test]
    fn test_message_pattern() {
        let filter = VersionFilter::MessagePattern(vec![Regex::new("^wip").unwrap()]);
        assert!(filter.exclude(&candidate("wip: half done", date(2024))).is_some());
        assert!(filter.exclude(&candidate("feat: done", date(2024))).is_none());
    }

    #[test]
    fn test_candidate_without_source_is_kept() {
        let filters = FilterSet::new(vec![
            VersionFilter::Sha(vec!["a".to_string()]),
            VersionFilter::MinimumDate(date(2100)),
        ]);
        let next = BaseVersion::new("NextVersion", false, SemanticVersion::new(2, 0, 0), None);
        assert!(filters.reasons(&next).is_empty());
    }

    #[test]
    fn test_all_reasons_are_kept() {
        let ignore = IgnoreConfig {
            sha: vec!["abc".to_string()],
            commits_before: Some(date(2030)),
            message_patterns: vec!["release".to_string()],
        };
        let filters = FilterSet::from_config(&ignore).unwrap();
        let mut diagnostics = Vec::new();
        let kept = filters.apply(vec![candidate("release 1.0", date(2024))], &mut diagnostics);

        assert!(kept.is_empty());
        match &diagnostics[0] {
            Diagnostic::CandidateExcluded { reasons, .. } => assert_eq!(reasons.len(), 3),
            other => panic!("unexpected diagnostic: {}", other),
        }
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let ignore = IgnoreConfig {
            message_patterns: vec!["(".to_string()],
            ..IgnoreConfig::default()
        };
        assert!(FilterSet::from_config(&ignore).is_err());
    }
}
