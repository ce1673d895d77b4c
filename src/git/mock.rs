use crate::error::{Result, VersionerError};
use crate::git::{Branch, Commit, GitTag, RepositoryGraph};
use chrono::{DateTime, Duration, Utc};
use git2::Oid;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::PathBuf;

/// In-memory history graph for testing without a git checkout
///
/// Commits get deterministic ids and timestamps one minute apart, so the
/// same sequence of builder calls always yields the same graph.
pub struct MockRepository {
    commits: HashMap<Oid, Commit>,
    order: HashMap<Oid, u64>,
    branches: BTreeMap<String, Oid>,
    tags: Vec<GitTag>,
    head: String,
    uncommitted: usize,
    metadata_dir: PathBuf,
    counter: u64,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_704_067_200, 0).unwrap_or_default()
}

impl MockRepository {
    /// Create an empty repository with `main` checked out
    pub fn new() -> Self {
        MockRepository {
            commits: HashMap::new(),
            order: HashMap::new(),
            branches: BTreeMap::new(),
            tags: Vec::new(),
            head: "main".to_string(),
            uncommitted: 0,
            metadata_dir: std::env::temp_dir().join("git-versioner-mock"),
            counter: 0,
        }
    }

    fn next_oid(&mut self) -> Oid {
        self.counter += 1;
        let digest = Sha256::digest(format!("mock-commit-{}", self.counter).as_bytes());
        Oid::from_bytes(&digest[..20]).unwrap_or_else(|_| Oid::zero())
    }

    fn insert(&mut self, message: &str, parents: Vec<Oid>) -> Oid {
        let id = self.next_oid();
        let when = epoch() + Duration::minutes(self.counter as i64);
        self.order.insert(id, self.counter);
        self.commits.insert(
            id,
            Commit {
                id,
                message: message.to_string(),
                when,
                parents,
            },
        );
        id
    }

    /// Add a commit on the checked-out branch and advance it
    pub fn add_commit(&mut self, message: &str) -> Oid {
        let parents = self.branches.get(&self.head).copied().into_iter().collect();
        let id = self.insert(message, parents);
        self.branches.insert(self.head.clone(), id);
        id
    }

    /// Add `count` commits with generated messages, returning the last id
    pub fn add_commits(&mut self, count: usize) -> Oid {
        let mut last = Oid::zero();
        for i in 0..count {
            last = self.add_commit(&format!("commit {}", i + 1));
        }
        last
    }

    /// Create a branch at the tip of the checked-out branch
    pub fn create_branch(&mut self, name: &str) {
        if let Some(tip) = self.branches.get(&self.head).copied() {
            self.branches.insert(name.to_string(), tip);
        }
    }

    /// Create a branch at an explicit commit
    pub fn create_branch_at(&mut self, name: &str, tip: Oid) {
        self.branches.insert(name.to_string(), tip);
    }

    pub fn checkout(&mut self, name: &str) {
        self.head = name.to_string();
    }

    /// Merge `source` into the checked-out branch with a merge commit
    pub fn merge(&mut self, source: &str, message: &str) -> Oid {
        let mut parents: Vec<Oid> = self.branches.get(&self.head).copied().into_iter().collect();
        if let Some(tip) = self.branches.get(source).copied() {
            parents.push(tip);
        }
        let id = self.insert(message, parents);
        self.branches.insert(self.head.clone(), id);
        id
    }

    /// Tag the tip of the checked-out branch
    pub fn add_tag(&mut self, name: &str) {
        if let Some(tip) = self.branches.get(&self.head).copied() {
            self.add_tag_at(name, tip);
        }
    }

    pub fn add_tag_at(&mut self, name: &str, target: Oid) {
        self.tags.push(GitTag {
            name: name.to_string(),
            target,
        });
    }

    pub fn set_uncommitted_changes(&mut self, count: usize) {
        self.uncommitted = count;
    }

    pub fn set_metadata_dir(&mut self, dir: impl Into<PathBuf>) {
        self.metadata_dir = dir.into();
    }

    pub fn tip(&self, branch: &str) -> Option<Oid> {
        self.branches.get(branch).copied()
    }

    fn find(&self, id: Oid) -> Result<&Commit> {
        self.commits
            .get(&id)
            .ok_or_else(|| VersionerError::repository(format!("Unknown commit: {}", id)))
    }

    fn ancestors(&self, tip: Oid) -> Result<HashSet<Oid>> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([tip]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            queue.extend(self.find(id)?.parents.iter().copied());
        }
        Ok(seen)
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryGraph for MockRepository {
    fn head(&self) -> Result<Branch> {
        let tip = self.branches.get(&self.head).copied().ok_or_else(|| {
            VersionerError::branch(format!("Branch '{}' has no commits", self.head))
        })?;
        Ok(Branch::new(self.head.clone(), tip))
    }

    fn branches(&self) -> Result<Vec<Branch>> {
        Ok(self
            .branches
            .iter()
            .map(|(name, tip)| Branch::new(name.clone(), *tip))
            .collect())
    }

    fn commit(&self, id: Oid) -> Result<Commit> {
        self.find(id).cloned()
    }

    fn commits_reachable(&self, tip: Oid, hide: Option<Oid>) -> Result<Vec<Commit>> {
        let hidden = match hide {
            Some(hide) => self.ancestors(hide)?,
            None => HashSet::new(),
        };
        let mut commits: Vec<Commit> = self
            .ancestors(tip)?
            .into_iter()
            .filter(|id| !hidden.contains(id))
            .map(|id| self.find(id).cloned())
            .collect::<Result<_>>()?;
        commits.sort_by_key(|c| std::cmp::Reverse(self.order.get(&c.id).copied().unwrap_or(0)));
        Ok(commits)
    }

    fn tags(&self) -> Result<Vec<GitTag>> {
        Ok(self.tags.clone())
    }

    fn merge_base(&self, a: Oid, b: Oid) -> Result<Option<Oid>> {
        let left = self.ancestors(a)?;
        let right = self.ancestors(b)?;
        Ok(left
            .intersection(&right)
            .copied()
            .max_by_key(|id| self.order.get(id).copied().unwrap_or(0)))
    }

    fn uncommitted_changes(&self) -> Result<usize> {
        Ok(self.uncommitted)
    }

    fn metadata_dir(&self) -> PathBuf {
        self.metadata_dir.clone()
    }
}
