//! Raw configuration model, built-in branch profiles and resolution
//!
//! - This module - the serde model as written in `GitVersion.toml`
//! - [`loader`] - locating and parsing configuration documents
//! - [`effective`] - the fully resolved per-branch settings
//! - [`resolver`] - turns raw configuration plus a branch into settings

pub mod effective;
pub mod loader;
pub mod resolver;

pub use effective::EffectiveConfiguration;
pub use loader::load_config;
pub use resolver::ConfigurationResolver;

use crate::domain::VersionField;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How the final version is derived from the winning candidate
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum VersioningMode {
    #[default]
    ContinuousDelivery,
    ContinuousDeployment,
    Mainline,
    ManualDeployment,
    TrunkBased,
}

/// Which field a branch bumps by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IncrementStrategy {
    None,
    #[default]
    Patch,
    Minor,
    Major,
    /// Take the increment of the branch this one was forked from
    Inherit,
}

impl IncrementStrategy {
    /// The concrete field, `None` for [`IncrementStrategy::Inherit`]
    pub fn as_field(&self) -> Option<VersionField> {
        match self {
            IncrementStrategy::None => Some(VersionField::None),
            IncrementStrategy::Patch => Some(VersionField::Patch),
            IncrementStrategy::Minor => Some(VersionField::Minor),
            IncrementStrategy::Major => Some(VersionField::Major),
            IncrementStrategy::Inherit => None,
        }
    }
}

/// Whether every commit bumps at least the default field, or only the range
/// since the last tag as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IncrementMode {
    #[default]
    PerTag,
    PerCommit,
}

/// Which commit messages are scanned for bump markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommitMessageIncrementing {
    #[default]
    Enabled,
    Disabled,
    MergeMessageOnly,
}

/// Which message conventions count as bump markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommitMessageConvention {
    /// `+semver: major|minor|patch|none` markers
    #[default]
    SemVer,
    /// `feat:`, `fix:`, `feat!:` and `BREAKING CHANGE:` headers
    ConventionalCommits,
    Both,
}

/// Version candidates to leave out of the calculation
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct IgnoreConfig {
    /// Commit sha prefixes, matched case-insensitively
    #[serde(default)]
    pub sha: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commits_before: Option<DateTime<Utc>>,

    /// Regular expressions matched against the source commit message
    #[serde(default)]
    pub message_patterns: Vec<String>,
}

impl IgnoreConfig {
    pub fn is_empty(&self) -> bool {
        self.sha.is_empty() && self.commits_before.is_none() && self.message_patterns.is_empty()
    }
}

/// Partial settings for branches whose name matches `regex`
///
/// Every field is optional; unset fields fall through to earlier matching
/// entries, then to the global settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct BranchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<VersioningMode>,

    /// Pre-release label template; `{BranchName}` is replaced by the branch
    /// name without the part matched by `regex`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment: Option<IncrementStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment_mode: Option<IncrementMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prevent_increment_of_merged_branch_version: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_merge_target: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracks_release_branches: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_release_branch: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mainline: Option<bool>,

    /// Names of branch entries this branch may be forked from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_branches: Option<Vec<String>>,

    /// Regex with a `number` group extracting a pull request number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_number_pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_release_weight: Option<u64>,
}

macro_rules! overlay_fields {
    ($target:expr, $other:expr, $($field:ident),+ $(,)?) => {
        $(
            if $other.$field.is_some() {
                $target.$field = $other.$field.clone();
            }
        )+
    };
}

impl BranchConfig {
    /// Apply every field `other` sets on top of `self`
    pub fn overlay(&mut self, other: &BranchConfig) {
        overlay_fields!(
            self,
            other,
            regex,
            mode,
            tag,
            increment,
            increment_mode,
            prevent_increment_of_merged_branch_version,
            track_merge_target,
            tracks_release_branches,
            is_release_branch,
            is_mainline,
            source_branches,
            tag_number_pattern,
            pre_release_weight,
        );
    }
}

/// Represents the complete raw configuration document.
///
/// Contains global settings, ignore rules, extra merge message formats and
/// the ordered branch entries.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct GitVersionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<VersioningMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment: Option<IncrementStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment_mode: Option<IncrementMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuous_delivery_fallback_tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_version_bump_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor_version_bump_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_version_bump_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_bump_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message_incrementing: Option<CommitMessageIncrementing>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message_convention: Option<CommitMessageConvention>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_number_start: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_recursion: Option<usize>,

    #[serde(default, skip_serializing_if = "IgnoreConfig::is_empty")]
    pub ignore: IgnoreConfig,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub merge_message_formats: IndexMap<String, String>,

    #[serde(default)]
    pub branches: IndexMap<String, BranchConfig>,
}

impl GitVersionConfig {
    /// Merge an override document over this one, field by field
    ///
    /// Branch entries with the same name are overlaid; new entries are
    /// appended in their declaration order.
    pub fn merge(&mut self, other: &GitVersionConfig) {
        overlay_fields!(
            self,
            other,
            mode,
            tag_prefix,
            next_version,
            increment,
            increment_mode,
            continuous_delivery_fallback_tag,
            major_version_bump_message,
            minor_version_bump_message,
            patch_version_bump_message,
            no_bump_message,
            commit_message_incrementing,
            commit_message_convention,
            label_number_start,
            max_recursion,
        );

        if !other.ignore.is_empty() {
            self.ignore.sha.extend(other.ignore.sha.iter().cloned());
            self.ignore
                .message_patterns
                .extend(other.ignore.message_patterns.iter().cloned());
            if other.ignore.commits_before.is_some() {
                self.ignore.commits_before = other.ignore.commits_before;
            }
        }

        for (name, format) in &other.merge_message_formats {
            self.merge_message_formats
                .insert(name.clone(), format.clone());
        }

        for (name, branch) in &other.branches {
            self.branches
                .entry(name.clone())
                .or_default()
                .overlay(branch);
        }
    }

    /// The built-in branch entries in declaration order
    pub fn default_branches() -> IndexMap<String, BranchConfig> {
        let mut branches = IndexMap::new();
        branches.insert(
            "main".to_string(),
            BranchConfig {
                regex: Some("^master$|^main$".to_string()),
                tag: Some(String::new()),
                increment: Some(IncrementStrategy::Patch),
                prevent_increment_of_merged_branch_version: Some(true),
                track_merge_target: Some(false),
                tracks_release_branches: Some(false),
                is_release_branch: Some(false),
                is_mainline: Some(true),
                source_branches: Some(vec!["develop".to_string(), "release".to_string()]),
                pre_release_weight: Some(55000),
                ..BranchConfig::default()
            },
        );
        branches.insert(
            "develop".to_string(),
            BranchConfig {
                regex: Some("^dev(elop)?(ment)?$".to_string()),
                mode: Some(VersioningMode::ContinuousDeployment),
                tag: Some("alpha".to_string()),
                increment: Some(IncrementStrategy::Minor),
                prevent_increment_of_merged_branch_version: Some(false),
                track_merge_target: Some(true),
                tracks_release_branches: Some(true),
                is_release_branch: Some(false),
                is_mainline: Some(false),
                source_branches: Some(vec!["main".to_string()]),
                pre_release_weight: Some(0),
                ..BranchConfig::default()
            },
        );
        branches.insert(
            "release".to_string(),
            BranchConfig {
                regex: Some("^releases?[/-]".to_string()),
                tag: Some("beta".to_string()),
                increment: Some(IncrementStrategy::None),
                prevent_increment_of_merged_branch_version: Some(true),
                track_merge_target: Some(false),
                tracks_release_branches: Some(false),
                is_release_branch: Some(true),
                is_mainline: Some(false),
                source_branches: Some(vec![
                    "develop".to_string(),
                    "main".to_string(),
                    "support".to_string(),
                    "release".to_string(),
                ]),
                pre_release_weight: Some(30000),
                ..BranchConfig::default()
            },
        );
        branches.insert(
            "feature".to_string(),
            BranchConfig {
                regex: Some("^features?[/-]".to_string()),
                tag: Some("{BranchName}".to_string()),
                increment: Some(IncrementStrategy::Inherit),
                prevent_increment_of_merged_branch_version: Some(false),
                track_merge_target: Some(false),
                tracks_release_branches: Some(false),
                is_release_branch: Some(false),
                is_mainline: Some(false),
                source_branches: Some(vec![
                    "develop".to_string(),
                    "main".to_string(),
                    "release".to_string(),
                    "feature".to_string(),
                    "support".to_string(),
                    "hotfix".to_string(),
                ]),
                pre_release_weight: Some(30000),
                ..BranchConfig::default()
            },
        );
        branches.insert(
            "pull-request".to_string(),
            BranchConfig {
                regex: Some("^(pull|pull\\-requests|pr)[/-]".to_string()),
                tag: Some("PullRequest".to_string()),
                increment: Some(IncrementStrategy::Inherit),
                prevent_increment_of_merged_branch_version: Some(false),
                track_merge_target: Some(false),
                tracks_release_branches: Some(false),
                is_release_branch: Some(false),
                is_mainline: Some(false),
                tag_number_pattern: Some("[/-](?P<number>\\d+)".to_string()),
                source_branches: Some(vec![
                    "develop".to_string(),
                    "main".to_string(),
                    "release".to_string(),
                    "feature".to_string(),
                    "support".to_string(),
                    "hotfix".to_string(),
                ]),
                pre_release_weight: Some(30000),
                ..BranchConfig::default()
            },
        );
        branches.insert(
            "hotfix".to_string(),
            BranchConfig {
                regex: Some("^hotfix(es)?[/-]".to_string()),
                tag: Some("beta".to_string()),
                increment: Some(IncrementStrategy::Patch),
                prevent_increment_of_merged_branch_version: Some(false),
                track_merge_target: Some(false),
                tracks_release_branches: Some(false),
                is_release_branch: Some(false),
                is_mainline: Some(false),
                source_branches: Some(vec![
                    "develop".to_string(),
                    "main".to_string(),
                    "support".to_string(),
                ]),
                pre_release_weight: Some(30000),
                ..BranchConfig::default()
            },
        );
        branches.insert(
            "support".to_string(),
            BranchConfig {
                regex: Some("^support[/-]".to_string()),
                tag: Some(String::new()),
                increment: Some(IncrementStrategy::Patch),
                prevent_increment_of_merged_branch_version: Some(true),
                track_merge_target: Some(false),
                tracks_release_branches: Some(false),
                is_release_branch: Some(false),
                is_mainline: Some(true),
                source_branches: Some(vec!["main".to_string()]),
                pre_release_weight: Some(55000),
                ..BranchConfig::default()
            },
        );
        branches
    }

    /// Profile applied to branches no entry matches
    pub fn unknown_branch() -> BranchConfig {
        BranchConfig {
            regex: Some(".*".to_string()),
            tag: Some("{BranchName}".to_string()),
            increment: Some(IncrementStrategy::Inherit),
            prevent_increment_of_merged_branch_version: Some(false),
            track_merge_target: Some(false),
            tracks_release_branches: Some(false),
            is_release_branch: Some(false),
            is_mainline: Some(false),
            pre_release_weight: Some(30000),
            ..BranchConfig::default()
        }
    }

    /// The built-in entries with this document's entries merged over them
    pub fn effective_branches(&self) -> IndexMap<String, BranchConfig> {
        let mut branches = Self::default_branches();
        for (name, branch) in &self.branches {
            branches.entry(name.clone()).or_default().overlay(branch);
        }
        branches
    }
}
