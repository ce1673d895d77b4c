use crate::error::{Result, VersionerError};
use crate::git::{Branch, Commit, GitTag, RepositoryGraph};
use crate::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use git2::{BranchType, ErrorCode, Oid, Repository as Git2Repo, Sort, StatusOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    ///
    /// Locked-file errors from a concurrent git process are retried with
    /// backoff; exhaustion surfaces as [VersionerError::Repository].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = RetryPolicy::default()
            .run(|| Git2Repo::discover(path), |e| e.code() == ErrorCode::Locked)
            .map_err(|e| match e.code() {
                ErrorCode::Locked => VersionerError::repository(format!(
                    "repository at '{}' stayed locked: {}",
                    path.display(),
                    e
                )),
                _ => VersionerError::Git(e),
            })?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    /// Working directory of a non-bare repository
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    fn to_commit(commit: &git2::Commit<'_>) -> Commit {
        let when = DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0).unwrap_or_default();
        Commit {
            id: commit.id(),
            message: commit.message().unwrap_or("").to_string(),
            when,
            parents: commit.parent_ids().collect(),
        }
    }
}

impl RepositoryGraph for Git2Repository {
    fn head(&self) -> Result<Branch> {
        let head = self.repo.head()?;
        let tip = head.peel_to_commit()?.id();
        let name = if head.is_branch() {
            head.shorthand().unwrap_or("HEAD").to_string()
        } else {
            "(no branch)".to_string()
        };
        Ok(Branch::new(name, tip))
    }

    fn branches(&self) -> Result<Vec<Branch>> {
        let mut branches = Vec::new();
        for entry in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            let Some(name) = branch.name()? else {
                continue;
            };
            let Some(tip) = branch.get().target() else {
                continue;
            };
            branches.push(Branch::new(name, tip));
        }
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    fn commit(&self, id: Oid) -> Result<Commit> {
        let commit = self.repo.find_commit(id)?;
        Ok(Self::to_commit(&commit))
    }

    fn commits_reachable(&self, tip: Oid, hide: Option<Oid>) -> Result<Vec<Commit>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(tip)?;
        if let Some(hide) = hide {
            revwalk.hide(hide)?;
        }

        let mut commits = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = self.repo.find_commit(oid)?;
            commits.push(Self::to_commit(&commit));
        }
        Ok(commits)
    }

    fn tags(&self) -> Result<Vec<GitTag>> {
        let names = self.repo.tag_names(None)?;
        let mut tags = Vec::new();

        for name in names.iter().flatten() {
            let reference = match self.repo.find_reference(&format!("refs/tags/{}", name)) {
                Ok(reference) => reference,
                Err(e) if e.code() == ErrorCode::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            // Tags on trees or blobs carry no version for us
            match reference.peel_to_commit() {
                Ok(commit) => tags.push(GitTag {
                    name: name.to_string(),
                    target: commit.id(),
                }),
                Err(e) => debug!(tag = name, error = %e, "skipping tag that does not point at a commit"),
            }
        }

        Ok(tags)
    }

    fn merge_base(&self, a: Oid, b: Oid) -> Result<Option<Oid>> {
        match self.repo.merge_base(a, b) {
            Ok(oid) => Ok(Some(oid)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn uncommitted_changes(&self) -> Result<usize> {
        if self.repo.is_bare() {
            return Ok(0);
        }
        let mut options = StatusOptions::new();
        options.include_untracked(true).include_ignored(false);
        Ok(self.repo.statuses(Some(&mut options))?.len())
    }

    fn metadata_dir(&self) -> PathBuf {
        self.repo.path().to_path_buf()
    }
}
