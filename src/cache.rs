//! Fingerprint-keyed on-disk cache of rendered variables
//!
//! Entries live at `<metadata-dir>/gitversion_cache/<fingerprint>.cache` as
//! TOML documents holding the variables and the diagnostics of the run that
//! produced them. A missing or unreadable entry only ever means the version
//! is computed again.

use crate::config::EffectiveConfiguration;
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::git::{Commit, RepositoryGraph};
use crate::retry::RetryPolicy;
use crate::variables::VersionVariables;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const CACHE_DIR: &str = "gitversion_cache";
const CACHE_EXTENSION: &str = "cache";

/// Hash of everything a computed version depends on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash the head commit, the resolved configuration, the number of
    /// uncommitted changes, and every tag and branch tip
    pub fn compute(
        repo: &dyn RepositoryGraph,
        head: &Commit,
        config: &EffectiveConfiguration,
    ) -> Result<Self> {
        let mut hasher = Sha256::new();
        hasher.update(head.sha().as_bytes());
        hasher.update(serde_json::to_vec(config)?);
        hasher.update((repo.uncommitted_changes()? as u64).to_le_bytes());

        let mut refs: Vec<String> = repo
            .tags()?
            .into_iter()
            .map(|t| format!("tag:{}={}", t.name, t.target))
            .collect();
        refs.extend(
            repo.branches()?
                .into_iter()
                .map(|b| format!("branch:{}={}", b.name, b.tip)),
        );
        refs.sort();
        for entry in refs {
            hasher.update(entry.as_bytes());
            hasher.update(b"\n");
        }

        Ok(Fingerprint(hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One cached result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub variables: VersionVariables,
    /// Warnings raised while computing `variables`, replayed on every hit
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Cache directory under a repository's metadata directory
pub struct VersionCache {
    dir: PathBuf,
    retry: RetryPolicy,
}

impl VersionCache {
    pub fn new(metadata_dir: &Path) -> Self {
        VersionCache {
            dir: metadata_dir.join(CACHE_DIR),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir
            .join(format!("{}.{}", fingerprint.as_str(), CACHE_EXTENSION))
    }

    /// Cached entry for `fingerprint`
    ///
    /// A corrupt entry is deleted and reported as a miss.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        let path = self.entry_path(fingerprint);
        let document = match fs::read_to_string(&path) {
            Ok(document) => document,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "cache miss");
                return None;
            }
            Err(e) => {
                self.discard(&path, &e.to_string());
                return None;
            }
        };

        match toml::from_str::<CacheEntry>(&document) {
            Ok(entry) if !entry.variables.is_empty() => {
                info!(path = %path.display(), "using cached version variables");
                Some(entry)
            }
            Ok(_) => {
                self.discard(&path, "entry is empty");
                None
            }
            Err(e) => {
                self.discard(&path, &e.to_string());
                None
            }
        }
    }

    fn discard(&self, path: &Path, reason: &str) {
        warn!(path = %path.display(), reason, "discarding corrupt cache entry");
        if let Err(e) = fs::remove_file(path) {
            debug!(path = %path.display(), error = %e, "could not delete cache entry");
        }
    }

    /// Store `variables` and the `diagnostics` raised computing them under
    /// `fingerprint`
    ///
    /// Writes go to a temporary file renamed into place, retried with
    /// backoff while another writer holds the file. Failure never aborts the
    /// computation; it comes back as a diagnostic instead.
    pub fn put(
        &self,
        fingerprint: &Fingerprint,
        variables: &VersionVariables,
        diagnostics: &[Diagnostic],
    ) -> Option<Diagnostic> {
        let path = self.entry_path(fingerprint);
        let entry = CacheEntry {
            variables: variables.clone(),
            diagnostics: diagnostics.to_vec(),
        };
        let document = match toml::to_string(&entry) {
            Ok(document) => document,
            Err(e) => return Some(self.write_failed(&path, &e.to_string())),
        };

        let tmp = path.with_extension(format!("{}.{}.tmp", CACHE_EXTENSION, std::process::id()));
        let result = self.retry.run(
            || {
                fs::create_dir_all(&self.dir)?;
                fs::write(&tmp, &document)?;
                fs::rename(&tmp, &path)
            },
            |_: &io::Error| true,
        );

        match result {
            Ok(()) => {
                debug!(path = %path.display(), "wrote cache entry");
                None
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                Some(self.write_failed(&path, &e.to_string()))
            }
        }
    }

    fn write_failed(&self, path: &Path, reason: &str) -> Diagnostic {
        warn!(path = %path.display(), reason, "could not write cache entry");
        Diagnostic::CacheWriteFailed {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
