//! Git history abstraction layer
//!
//! This module provides a read-only, trait-based view over a repository's
//! history graph, allowing for multiple implementations including real Git
//! repositories and in-memory graphs for testing.
//!
//! # Overview
//!
//! The primary abstraction is the [RepositoryGraph] trait, which defines the
//! queries the version pipeline needs. The concrete implementations include:
//!
//! - [repository::Git2Repository]: A real implementation using the `git2` crate
//! - [mock::MockRepository]: A deterministic in-memory graph for testing
//!
//! # Usage
//!
//! Pipeline code depends on `&dyn RepositoryGraph` rather than concrete
//! implementations. No method mutates the repository.
//!
//! ```rust
//! # use git_versioner::git::RepositoryGraph;
//! # fn example(repo: &dyn RepositoryGraph) -> git_versioner::Result<()> {
//! let head = repo.head()?;
//! let history = repo.commits_reachable(head.tip, None)?;
//! println!("{} has {} commits", head.name, history.len());
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use crate::domain::BranchName;
use crate::error::Result;
use chrono::{DateTime, Utc};
use git2::Oid;
use std::collections::HashSet;
use std::path::PathBuf;

/// Commit information for analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: Oid,
    /// The full commit message
    pub message: String,
    /// Committer timestamp
    pub when: DateTime<Utc>,
    pub parents: Vec<Oid>,
}

impl Commit {
    pub fn sha(&self) -> String {
        self.id.to_string()
    }

    pub fn short_sha(&self) -> String {
        self.sha().chars().take(7).collect()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// A branch and the commit at its tip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: BranchName,
    pub tip: Oid,
}

impl Branch {
    pub fn new(name: impl Into<String>, tip: Oid) -> Self {
        Branch {
            name: BranchName::new(name),
            tip,
        }
    }
}

/// A tag resolved to the commit it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitTag {
    pub name: String,
    pub target: Oid,
}

/// Read-only queries over a repository's history graph
///
/// ## Error Handling
///
/// All methods return [crate::error::Result<T>]. Implementations map backend
/// failures to [crate::error::VersionerError::Git] or, once transient
/// failures are exhausted, [crate::error::VersionerError::Repository].
///
/// ## Implementations
///
/// - [Git2Repository](repository::Git2Repository): Real Git implementation using the `git2` crate
/// - [MockRepository](mock::MockRepository): In-memory graph for tests
pub trait RepositoryGraph {
    /// The checked-out branch
    fn head(&self) -> Result<Branch>;

    /// All local branches, sorted by name
    fn branches(&self) -> Result<Vec<Branch>>;

    /// Look up a commit by id
    fn commit(&self, id: Oid) -> Result<Commit>;

    /// Commits reachable from `tip`, newest first
    ///
    /// When `hide` is given, commits reachable from it are excluded, which
    /// yields the range `hide..tip`.
    fn commits_reachable(&self, tip: Oid, hide: Option<Oid>) -> Result<Vec<Commit>>;

    /// All tags that resolve to a commit
    fn tags(&self) -> Result<Vec<GitTag>>;

    /// Nearest common ancestor of two commits
    fn merge_base(&self, a: Oid, b: Oid) -> Result<Option<Oid>>;

    /// Number of uncommitted local changes in the working tree
    fn uncommitted_changes(&self) -> Result<usize>;

    /// Directory holding repository metadata (`.git`)
    fn metadata_dir(&self) -> PathBuf;

    /// Find a local branch by name
    fn find_branch(&self, name: &str) -> Result<Option<Branch>> {
        Ok(self
            .branches()?
            .into_iter()
            .find(|b| b.name.as_str() == name || b.name.friendly() == name))
    }
}

/// Number of commits in `source..tip`, or every commit reachable from `tip`
/// when there is no source
pub fn count_commits_since(
    repo: &dyn RepositoryGraph,
    tip: Oid,
    source: Option<Oid>,
) -> Result<u64> {
    Ok(repo.commits_reachable(tip, source)?.len() as u64)
}

/// The oldest root commit reachable from `tip`
pub fn root_commit(repo: &dyn RepositoryGraph, tip: Oid) -> Result<Option<Commit>> {
    Ok(repo
        .commits_reachable(tip, None)?
        .into_iter()
        .filter(|c| c.parents.is_empty())
        .min_by_key(|c| c.when))
}

/// First-parent history from `tip` back to (excluding) the first commit in
/// `stop`, oldest first
pub fn first_parent_history(
    repo: &dyn RepositoryGraph,
    tip: Oid,
    stop: &HashSet<Oid>,
) -> Result<Vec<Commit>> {
    let mut history = Vec::new();
    let mut current = Some(tip);
    while let Some(id) = current {
        if stop.contains(&id) {
            break;
        }
        let commit = repo.commit(id)?;
        current = commit.parents.first().copied();
        history.push(commit);
    }
    history.reverse();
    Ok(history)
}

/// Ids of every commit reachable from `tip` (inclusive)
pub fn ancestry(repo: &dyn RepositoryGraph, tip: Option<Oid>) -> Result<HashSet<Oid>> {
    match tip {
        Some(tip) => Ok(repo
            .commits_reachable(tip, None)?
            .into_iter()
            .map(|c| c.id)
            .collect()),
        None => Ok(HashSet::new()),
    }
}
