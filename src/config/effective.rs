use crate::config::{
    CommitMessageConvention, CommitMessageIncrementing, IgnoreConfig, IncrementMode,
    VersioningMode,
};
use crate::domain::{PreReleaseTag, TagPrefix, VersionField};
use crate::error::Result;
use indexmap::IndexMap;
use serde::Serialize;

pub const DEFAULT_TAG_PREFIX: &str = "[vV]";
pub const DEFAULT_FALLBACK_TAG: &str = "ci";
pub const DEFAULT_MAJOR_BUMP_MESSAGE: &str = r"\+semver:\s?(breaking|major)";
pub const DEFAULT_MINOR_BUMP_MESSAGE: &str = r"\+semver:\s?(feature|minor)";
pub const DEFAULT_PATCH_BUMP_MESSAGE: &str = r"\+semver:\s?(fix|patch)";
pub const DEFAULT_NO_BUMP_MESSAGE: &str = r"\+semver:\s?(none|skip)";
pub const DEFAULT_MAX_RECURSION: usize = 5;
pub const DEFAULT_LABEL_NUMBER_START: u64 = 1;

/// Fully resolved settings for one branch
///
/// Produced by [`ConfigurationResolver`](crate::config::ConfigurationResolver)
/// and never mutated afterwards. The serialized form feeds the cache
/// fingerprint, so every field that influences the result lives here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct EffectiveConfiguration {
    /// Friendly name of the branch the settings were resolved for
    pub branch_name: String,
    /// Name of the last branch entry that matched, `unknown` if none did
    pub matched_entry: String,
    pub branch_regex: String,
    pub mode: VersioningMode,
    pub tag_prefix: String,
    /// Pre-release label with placeholders expanded; `None` for releases
    pub label: Option<String>,
    pub increment: VersionField,
    pub increment_mode: IncrementMode,
    pub prevent_increment_of_merged_branch_version: bool,
    pub track_merge_target: bool,
    pub tracks_release_branches: bool,
    pub is_release_branch: bool,
    pub is_mainline: bool,
    pub source_branches: Vec<String>,
    /// Branch this one was resolved against when it inherits settings
    pub merge_target: Option<String>,
    pub next_version: Option<String>,
    pub continuous_delivery_fallback_tag: String,
    pub major_version_bump_message: String,
    pub minor_version_bump_message: String,
    pub patch_version_bump_message: String,
    pub no_bump_message: String,
    pub commit_message_incrementing: CommitMessageIncrementing,
    pub commit_message_convention: CommitMessageConvention,
    pub label_number_start: u64,
    pub pre_release_weight: u64,
    pub ignore: IgnoreConfig,
    pub merge_message_formats: IndexMap<String, String>,
}

impl EffectiveConfiguration {
    /// Compile the tag prefix pattern
    pub fn tag_prefix(&self) -> Result<TagPrefix> {
        TagPrefix::new(self.tag_prefix.clone())
    }

    /// Label to use in pre-release modes, falling back to the configured
    /// continuous delivery tag when the branch has none
    pub fn label_or_fallback(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.continuous_delivery_fallback_tag.clone())
    }

    /// Does `tag` carry this branch's label?
    pub fn matches_label(&self, tag: &PreReleaseTag) -> bool {
        match &self.label {
            Some(label) => tag.matches_label(label),
            None => false,
        }
    }

    pub fn uses_semver_markers(&self) -> bool {
        matches!(
            self.commit_message_convention,
            CommitMessageConvention::SemVer | CommitMessageConvention::Both
        )
    }

    pub fn uses_conventional_commits(&self) -> bool {
        matches!(
            self.commit_message_convention,
            CommitMessageConvention::ConventionalCommits | CommitMessageConvention::Both
        )
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Settings for a plain release branch called `main`
    pub fn effective(mode: VersioningMode) -> EffectiveConfiguration {
        EffectiveConfiguration {
            branch_name: "main".to_string(),
            matched_entry: "main".to_string(),
            branch_regex: "^main$".to_string(),
            mode,
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
            label: None,
            increment: VersionField::Patch,
            increment_mode: IncrementMode::PerTag,
            prevent_increment_of_merged_branch_version: true,
            track_merge_target: false,
            tracks_release_branches: false,
            is_release_branch: false,
            is_mainline: true,
            source_branches: Vec::new(),
            merge_target: None,
            next_version: None,
            continuous_delivery_fallback_tag: DEFAULT_FALLBACK_TAG.to_string(),
            major_version_bump_message: DEFAULT_MAJOR_BUMP_MESSAGE.to_string(),
            minor_version_bump_message: DEFAULT_MINOR_BUMP_MESSAGE.to_string(),
            patch_version_bump_message: DEFAULT_PATCH_BUMP_MESSAGE.to_string(),
            no_bump_message: DEFAULT_NO_BUMP_MESSAGE.to_string(),
            commit_message_incrementing: CommitMessageIncrementing::Enabled,
            commit_message_convention: CommitMessageConvention::SemVer,
            label_number_start: DEFAULT_LABEL_NUMBER_START,
            pre_release_weight: 55000,
            ignore: IgnoreConfig::default(),
            merge_message_formats: IndexMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::effective;
    use super::*;

    #[test]
    fn test_label_fallback() {
        let mut config = effective(VersioningMode::ContinuousDeployment);
        assert_eq!(config.label_or_fallback(), "ci");
        config.label = Some("alpha".to_string());
        assert_eq!(config.label_or_fallback(), "alpha");
    }

    #[test]
    fn test_matches_label() {
        let mut config = effective(VersioningMode::ContinuousDelivery);
        let beta = PreReleaseTag::new("beta", Some(2));
        assert!(!config.matches_label(&beta));
        config.label = Some("Beta".to_string());
        assert!(config.matches_label(&beta));
    }

    #[test]
    fn test_serialization_is_stable() {
        let config = effective(VersioningMode::Mainline);
        let first = serde_json::to_string(&config).unwrap();
        let second = serde_json::to_string(&config.clone()).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("\"tag-prefix\":\"[vV]\""));
    }
}
