//! The version calculation pipeline
//!
//! ```text
//! branch -> effective configuration -> cache lookup -> candidates -> filters
//!        -> increment decision -> mode calculator -> monotonicity check
//!        -> variables -> cache store
//! ```
//!
//! Recoverable problems along the way are collected as diagnostics in the
//! [`VersionResult`]; only fatal conditions come back as errors.

use crate::analyzer::IncrementStrategyFinder;
use crate::cache::{Fingerprint, VersionCache};
use crate::calculators::{self, increment_candidate, CalculationContext, Winner};
use crate::config::{ConfigurationResolver, EffectiveConfiguration, GitVersionConfig};
use crate::diagnostics::Diagnostic;
use crate::domain::{BuildMetadata, SemanticVersion, TagPrefix, VersionTag};
use crate::error::{Result, VersionerError};
use crate::filters::FilterSet;
use crate::git::{ancestry, count_commits_since, Branch, Commit, RepositoryGraph};
use crate::strategies::{self, fallback, BaseVersion, StrategyContext};
use crate::variables::VersionVariables;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// Per-run options layered on top of the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct CalculatorOptions {
    /// Branch to version instead of the checked-out one
    pub branch: Option<String>,
    /// Skip both reading and writing the cache
    pub no_cache: bool,
    /// Settings merged field-by-field over the loaded configuration
    pub overrides: GitVersionConfig,
}

/// Outcome of one calculation
#[derive(Debug, Clone)]
pub struct VersionResult {
    pub version: SemanticVersion,
    pub variables: VersionVariables,
    pub config: EffectiveConfiguration,
    pub diagnostics: Vec<Diagnostic>,
    pub from_cache: bool,
}

pub struct VersionCalculator<'a> {
    repo: &'a dyn RepositoryGraph,
    resolver: ConfigurationResolver,
    options: CalculatorOptions,
}

impl<'a> VersionCalculator<'a> {
    pub fn new(repo: &'a dyn RepositoryGraph, config: GitVersionConfig) -> Result<Self> {
        Self::with_options(repo, config, CalculatorOptions::default())
    }

    pub fn with_options(
        repo: &'a dyn RepositoryGraph,
        config: GitVersionConfig,
        options: CalculatorOptions,
    ) -> Result<Self> {
        let resolver = ConfigurationResolver::with_overrides(config, &options.overrides)?;
        Ok(VersionCalculator {
            repo,
            resolver,
            options,
        })
    }

    fn target_branch(&self) -> Result<Branch> {
        match self.options.branch.as_deref() {
            Some(name) => self
                .repo
                .find_branch(name)?
                .ok_or_else(|| VersionerError::branch(format!("Branch '{}' not found", name))),
            None => self.repo.head(),
        }
    }

    /// Compute the version of the target branch's tip
    pub fn calculate(&self) -> Result<VersionResult> {
        let branch = self.target_branch()?;
        let tip = self.repo.commit(branch.tip)?;
        let config = self.resolver.resolve(self.repo, &branch)?;
        debug!(branch = %branch.name, entry = %config.matched_entry, mode = ?config.mode, "resolved configuration");

        let cache = (!self.options.no_cache).then(|| VersionCache::new(&self.repo.metadata_dir()));
        let fingerprint = match &cache {
            Some(_) => Some(Fingerprint::compute(self.repo, &tip, &config)?),
            None => None,
        };
        if let (Some(cache), Some(fingerprint)) = (&cache, &fingerprint) {
            if let Some(hit) = self.from_cache(cache, fingerprint, &config) {
                return Ok(hit);
            }
        }

        let mut diagnostics = Vec::new();
        let version = self.compute(&branch, &tip, &config, &mut diagnostics)?;
        let variables = VersionVariables::from_version(&version, &config);

        if let (Some(cache), Some(fingerprint)) = (&cache, &fingerprint) {
            let write_failure = cache.put(fingerprint, &variables, &diagnostics);
            diagnostics.extend(write_failure);
        }

        Ok(VersionResult {
            version,
            variables,
            config,
            diagnostics,
            from_cache: false,
        })
    }

    fn from_cache(
        &self,
        cache: &VersionCache,
        fingerprint: &Fingerprint,
        config: &EffectiveConfiguration,
    ) -> Option<VersionResult> {
        let entry = cache.get(fingerprint)?;
        let Some(version) = version_from_variables(&entry.variables) else {
            warn!(%fingerprint, "cached variables do not describe a version, recomputing");
            return None;
        };
        info!(%version, "version served from cache");
        Some(VersionResult {
            version,
            variables: entry.variables,
            config: config.clone(),
            diagnostics: entry.diagnostics,
            from_cache: true,
        })
    }

    fn compute(
        &self,
        branch: &Branch,
        tip: &Commit,
        config: &EffectiveConfiguration,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<SemanticVersion> {
        let prefix = config.tag_prefix()?;
        let filters = FilterSet::from_config(&config.ignore)?;
        let tags = reachable_tags(self.repo, tip, &prefix, &filters)?;

        let strategy_ctx = StrategyContext {
            repo: self.repo,
            branch,
            tip,
            config,
            resolver: &self.resolver,
            tag_prefix: &prefix,
        };
        let mut candidates = filters.apply(strategies::collect_candidates(&strategy_ctx)?, diagnostics);
        if candidates.is_empty() {
            let fallback = fallback::candidate(&strategy_ctx)?;
            warn!(version = %fallback.version, "no usable base version, falling back");
            diagnostics.push(Diagnostic::NoTagsFound {
                fallback: fallback.version.to_string(),
            });
            candidates.push(fallback);
        }

        let (version, source) = match tagged_tip(&tags, tip) {
            Some(tag) => {
                info!(tag = %tag.name, "tip is tagged, using the tag version");
                (tag.version.clone(), Some(tip.clone()))
            }
            None => {
                let finder = IncrementStrategyFinder::new(config, &branch.name, &prefix)?;
                let ctx = CalculationContext {
                    repo: self.repo,
                    branch,
                    tip,
                    config,
                    resolver: &self.resolver,
                    tag_prefix: &prefix,
                    finder: &finder,
                    tags: &tags,
                };
                let winner = choose_winner(&ctx, candidates)?;
                info!(base = %winner.base, field = %winner.field, "chose base version");
                let version = calculators::calculate(&ctx, &winner)?;
                (version, winner.base.source_commit)
            }
        };

        check_monotonicity(&version, &tags, config)?;

        let source_id = source.as_ref().map(|c| c.id);
        let build = BuildMetadata {
            commits_since_version_source: count_commits_since(self.repo, tip.id, source_id)?,
            branch: Some(branch.name.friendly().to_string()),
            sha: Some(tip.sha()),
            short_sha: Some(tip.short_sha()),
            commit_date: Some(tip.when),
            version_source_sha: source.as_ref().map(Commit::sha),
            uncommitted_changes: self.repo.uncommitted_changes()? as u64,
        };
        Ok(version.with_build(build))
    }
}

/// Version tags on commits reachable from `tip` that no ignore rule
/// excludes, oldest first
fn reachable_tags(
    repo: &dyn RepositoryGraph,
    tip: &Commit,
    prefix: &TagPrefix,
    filters: &FilterSet,
) -> Result<Vec<VersionTag>> {
    let reachable = ancestry(repo, Some(tip.id))?;
    let mut tags = Vec::new();
    for tag in repo.tags()? {
        if !reachable.contains(&tag.target) {
            continue;
        }
        let Some(version_tag) = prefix.version_tag(&tag.name, tag.target) else {
            continue;
        };
        let commit = repo.commit(tag.target)?;
        let when = commit.when;
        let as_candidate = BaseVersion::new(tag.name, false, version_tag.version.clone(), Some(commit));
        if filters.reasons(&as_candidate).is_empty() {
            tags.push((when, version_tag));
        }
    }
    tags.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.version.cmp(&b.1.version)));
    Ok(tags.into_iter().map(|(_, tag)| tag).collect())
}

/// The highest version tag placed on the tip itself
fn tagged_tip<'t>(tags: &'t [VersionTag], tip: &Commit) -> Option<&'t VersionTag> {
    tags.iter()
        .filter(|t| t.commit == tip.id)
        .max_by(|a, b| a.version.cmp(&b.version))
}

/// Highest incremented candidate; ties go to the oldest source commit
fn choose_winner(ctx: &CalculationContext<'_>, candidates: Vec<BaseVersion>) -> Result<Winner> {
    let mut best: Option<Winner> = None;
    for base in candidates {
        let field = ctx.finder.determine(ctx.repo, &base, ctx.tip)?;
        let version = increment_candidate(&base, field, ctx.label_applies())?;
        debug!(candidate = %base, %version, "incremented candidate");
        let source = base.source_commit.as_ref().map(|c| c.id);
        let winner = Winner {
            commits_since_source: count_commits_since(ctx.repo, ctx.tip.id, source)?,
            base,
            field,
            version,
        };
        best = match best {
            Some(current) if !outranks(&winner, &current) => Some(current),
            _ => Some(winner),
        };
    }
    best.ok_or_else(|| VersionerError::config("no base version candidates"))
}

fn outranks(a: &Winner, b: &Winner) -> bool {
    match a.version.cmp(&b.version) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => source_date(a) < source_date(b),
    }
}

/// Candidates without a source commit lose ties
fn source_date(winner: &Winner) -> DateTime<Utc> {
    winner
        .base
        .source_commit
        .as_ref()
        .map_or(DateTime::<Utc>::MAX_UTC, |c| c.when)
}

/// The final version may not rank below the latest reachable tag
///
/// A pre-release tag with a label this branch does not use is only compared
/// on its numeric triple.
fn check_monotonicity(
    version: &SemanticVersion,
    tags: &[VersionTag],
    config: &EffectiveConfiguration,
) -> Result<()> {
    let Some(latest) = tags.last() else {
        return Ok(());
    };
    let foreign_label = latest
        .version
        .pre_release
        .as_ref()
        .is_some_and(|p| p.has_tag() && !config.matches_label(p));
    let lower = if foreign_label {
        version.to_release() < latest.version.to_release()
    } else {
        *version < latest.version
    };
    if lower {
        return Err(VersionerError::Monotonicity {
            computed: version.to_string(),
            tag: latest.name.clone(),
        });
    }
    Ok(())
}

/// Rebuild a version from rendered variables
fn version_from_variables(variables: &VersionVariables) -> Option<SemanticVersion> {
    let version = SemanticVersion::parse(variables.get("SemVer")?).ok()?;
    let non_empty = |name: &str| {
        variables
            .get(name)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let build = BuildMetadata {
        commits_since_version_source: variables.get("CommitsSinceVersionSource")?.parse().ok()?,
        branch: non_empty("BranchName"),
        sha: non_empty("Sha"),
        short_sha: non_empty("ShortSha"),
        commit_date: variables
            .get("CommitDate")
            .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc()),
        version_source_sha: non_empty("VersionSourceSha"),
        uncommitted_changes: variables.get("UncommittedChanges")?.parse().ok()?,
    };
    Some(version.with_build(build))
}
