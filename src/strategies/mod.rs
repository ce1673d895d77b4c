//! Base version strategies
//!
//! Each strategy mines one kind of evidence for a version candidate:
//!
//! - [`tagged_commit`] - version tags reachable from the tip
//! - [`config_next_version`] - an explicit `next-version` setting
//! - [`merge_message`] - merges of release branches named in commit messages
//! - [`version_in_branch_name`] - the version a release branch is named after
//! - [`mainline_sibling`] - versions of release branches a branch tracks
//! - [`fallback`] - `0.1.0` at the root when nothing else survives
//!
//! Strategies are independent of each other and of the mode calculators;
//! the pipeline takes the union of their candidates.

pub mod config_next_version;
pub mod fallback;
pub mod mainline_sibling;
pub mod merge_message;
pub mod tagged_commit;
pub mod version_in_branch_name;

use crate::config::{ConfigurationResolver, EffectiveConfiguration};
use crate::domain::{SemanticVersion, TagPrefix};
use crate::error::Result;
use crate::git::{Branch, Commit, RepositoryGraph};
use std::fmt;
use tracing::debug;

/// A version candidate produced by one strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseVersion {
    /// Human-readable origin, e.g. `Git tag 'v1.2.0'`
    pub source: String,
    pub should_increment: bool,
    pub version: SemanticVersion,
    /// Commit the version was read from; commits after it count towards it
    pub source_commit: Option<Commit>,
}

impl BaseVersion {
    pub fn new(
        source: impl Into<String>,
        should_increment: bool,
        version: SemanticVersion,
        source_commit: Option<Commit>,
    ) -> Self {
        BaseVersion {
            source: source.into(),
            should_increment,
            version,
            source_commit,
        }
    }

    pub fn source_sha(&self) -> Option<String> {
        self.source_commit.as_ref().map(Commit::sha)
    }
}

impl fmt::Display for BaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (increment: {}, source: {})",
            self.source,
            self.version,
            self.should_increment,
            self.source_commit
                .as_ref()
                .map(Commit::short_sha)
                .unwrap_or_else(|| "none".to_string())
        )
    }
}

/// Everything a strategy may look at
pub struct StrategyContext<'a> {
    pub repo: &'a dyn RepositoryGraph,
    pub branch: &'a Branch,
    pub tip: &'a Commit,
    pub config: &'a EffectiveConfiguration,
    pub resolver: &'a ConfigurationResolver,
    pub tag_prefix: &'a TagPrefix,
}

/// The closed set of candidate producers run for every calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionStrategy {
    TaggedCommit,
    ConfigNextVersion,
    MergeMessage,
    VersionInBranchName,
    MainlineSibling,
}

impl VersionStrategy {
    pub const ALL: [VersionStrategy; 5] = [
        VersionStrategy::TaggedCommit,
        VersionStrategy::ConfigNextVersion,
        VersionStrategy::MergeMessage,
        VersionStrategy::VersionInBranchName,
        VersionStrategy::MainlineSibling,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            VersionStrategy::TaggedCommit => "tagged-commit",
            VersionStrategy::ConfigNextVersion => "config-next-version",
            VersionStrategy::MergeMessage => "merge-message",
            VersionStrategy::VersionInBranchName => "version-in-branch-name",
            VersionStrategy::MainlineSibling => "mainline-sibling",
        }
    }

    /// Candidates this strategy finds; empty when it finds nothing
    pub fn candidates(&self, ctx: &StrategyContext<'_>) -> Result<Vec<BaseVersion>> {
        match self {
            VersionStrategy::TaggedCommit => tagged_commit::candidates(ctx),
            VersionStrategy::ConfigNextVersion => config_next_version::candidates(ctx),
            VersionStrategy::MergeMessage => merge_message::candidates(ctx),
            VersionStrategy::VersionInBranchName => version_in_branch_name::candidates(ctx),
            VersionStrategy::MainlineSibling => mainline_sibling::candidates(ctx),
        }
    }
}

/// Union of every strategy's candidates
pub fn collect_candidates(ctx: &StrategyContext<'_>) -> Result<Vec<BaseVersion>> {
    let mut all = Vec::new();
    for strategy in VersionStrategy::ALL {
        let found = strategy.candidates(ctx)?;
        for candidate in &found {
            debug!(strategy = strategy.name(), %candidate, "found base version");
        }
        all.extend(found);
    }
    Ok(all)
}

/// Where `branch` was forked from: the newest merge-base with any other
/// branch, or the root commit when it shares history with none
pub(crate) fn branch_point(repo: &dyn RepositoryGraph, branch: &Branch) -> Result<Option<Commit>> {
    let mut best: Option<Commit> = None;
    for other in repo.branches()? {
        if other.name.friendly() == branch.name.friendly() {
            continue;
        }
        let Some(base) = repo.merge_base(branch.tip, other.tip)? else {
            continue;
        };
        let commit = repo.commit(base)?;
        if best.as_ref().map_or(true, |b| commit.when > b.when) {
            best = Some(commit);
        }
    }
    match best {
        Some(commit) => Ok(Some(commit)),
        None => crate::git::root_commit(repo, branch.tip),
    }
}
