use crate::config::effective::{
    DEFAULT_FALLBACK_TAG, DEFAULT_LABEL_NUMBER_START, DEFAULT_MAJOR_BUMP_MESSAGE,
    DEFAULT_MAX_RECURSION, DEFAULT_MINOR_BUMP_MESSAGE, DEFAULT_NO_BUMP_MESSAGE,
    DEFAULT_PATCH_BUMP_MESSAGE, DEFAULT_TAG_PREFIX,
};
use crate::config::{BranchConfig, EffectiveConfiguration, GitVersionConfig, IncrementStrategy};
use crate::domain::{escape_identifier, BranchName, VersionField};
use crate::error::{Result, VersionerError};
use crate::git::{Branch, RepositoryGraph};
use regex::Regex;
use std::cmp::Reverse;
use tracing::debug;

/// Name reported for branches no entry matches
pub const UNKNOWN_ENTRY: &str = "unknown";

#[derive(Debug)]
struct CompiledEntry {
    name: String,
    regex: Regex,
    tag_number: Option<Regex>,
    settings: BranchConfig,
}

/// Merged settings of every entry matching a branch name
#[derive(Debug, Clone)]
pub struct BranchProfile {
    /// Name of the last matching entry
    pub entry: String,
    pub regex: Regex,
    /// Compiled `tag-number-pattern` of the last entry that set one
    pub tag_number: Option<Regex>,
    pub settings: BranchConfig,
}

impl BranchProfile {
    fn needs_parent(&self) -> bool {
        self.settings.increment == Some(IncrementStrategy::Inherit)
            || self.settings.track_merge_target == Some(true)
    }

    pub fn is_release_branch(&self) -> bool {
        self.settings.is_release_branch == Some(true)
    }
}

/// Resolves raw configuration into [`EffectiveConfiguration`] per branch
///
/// All regular expressions are compiled up front, so a malformed pattern
/// fails construction rather than a later lookup. Resolution follows
/// inheritance links (`increment = Inherit`, `track-merge-target`) through
/// the branch a branch was forked from, bounded by `max-recursion` and by a
/// visited set that turns cycles into configuration errors.
#[derive(Debug)]
pub struct ConfigurationResolver {
    config: GitVersionConfig,
    entries: Vec<CompiledEntry>,
    unknown: CompiledEntry,
}

impl ConfigurationResolver {
    pub fn new(config: GitVersionConfig) -> Result<Self> {
        let mut entries = Vec::new();
        for (name, settings) in config.effective_branches() {
            let pattern = settings.regex.clone().ok_or_else(|| {
                VersionerError::config(format!("branch entry '{}' has no regex", name))
            })?;
            let regex = compile(&pattern, &format!("branch entry '{}'", name))?;
            let tag_number = match &settings.tag_number_pattern {
                Some(number) => Some(compile(number, &format!("tag-number-pattern of '{}'", name))?),
                None => None,
            };
            entries.push(CompiledEntry {
                name,
                regex,
                tag_number,
                settings,
            });
        }

        let unknown_settings = GitVersionConfig::unknown_branch();
        let unknown = CompiledEntry {
            name: UNKNOWN_ENTRY.to_string(),
            regex: compile(unknown_settings.regex.as_deref().unwrap_or(".*"), UNKNOWN_ENTRY)?,
            tag_number: None,
            settings: unknown_settings,
        };

        let resolver = ConfigurationResolver {
            config,
            entries,
            unknown,
        };
        resolver.validate_patterns()?;
        Ok(resolver)
    }

    /// Resolver over `config` with a caller override document merged in
    pub fn with_overrides(mut config: GitVersionConfig, overrides: &GitVersionConfig) -> Result<Self> {
        config.merge(overrides);
        Self::new(config)
    }

    fn validate_patterns(&self) -> Result<()> {
        compile(self.tag_prefix_pattern(), "tag-prefix")?;
        for (name, pattern) in self.bump_messages() {
            compile(&format!("(?i){}", pattern), name)?;
        }
        for pattern in &self.config.ignore.message_patterns {
            compile(pattern, "ignore.message-patterns")?;
        }
        for (name, pattern) in &self.config.merge_message_formats {
            compile(pattern, &format!("merge message format '{}'", name))?;
        }
        Ok(())
    }

    pub fn config(&self) -> &GitVersionConfig {
        &self.config
    }

    fn tag_prefix_pattern(&self) -> &str {
        self.config.tag_prefix.as_deref().unwrap_or(DEFAULT_TAG_PREFIX)
    }

    fn bump_messages(&self) -> [(&'static str, &str); 4] {
        let c = &self.config;
        [
            (
                "major-version-bump-message",
                c.major_version_bump_message.as_deref().unwrap_or(DEFAULT_MAJOR_BUMP_MESSAGE),
            ),
            (
                "minor-version-bump-message",
                c.minor_version_bump_message.as_deref().unwrap_or(DEFAULT_MINOR_BUMP_MESSAGE),
            ),
            (
                "patch-version-bump-message",
                c.patch_version_bump_message.as_deref().unwrap_or(DEFAULT_PATCH_BUMP_MESSAGE),
            ),
            (
                "no-bump-message",
                c.no_bump_message.as_deref().unwrap_or(DEFAULT_NO_BUMP_MESSAGE),
            ),
        ]
    }

    /// Merge every entry whose regex matches `branch`, in declaration order
    ///
    /// Later entries override earlier ones field by field. Branches no entry
    /// matches get the unknown-branch profile.
    pub fn profile_for(&self, branch: &str) -> BranchProfile {
        let name = BranchName::new(branch);
        let friendly = name.friendly();
        let mut matched: Option<BranchProfile> = None;

        for entry in self.entries.iter().filter(|e| e.regex.is_match(friendly)) {
            match matched.as_mut() {
                Some(profile) => {
                    profile.settings.overlay(&entry.settings);
                    profile.entry = entry.name.clone();
                    profile.regex = entry.regex.clone();
                    if entry.tag_number.is_some() {
                        profile.tag_number = entry.tag_number.clone();
                    }
                }
                None => {
                    matched = Some(BranchProfile {
                        entry: entry.name.clone(),
                        regex: entry.regex.clone(),
                        tag_number: entry.tag_number.clone(),
                        settings: entry.settings.clone(),
                    })
                }
            }
        }

        matched.unwrap_or_else(|| BranchProfile {
            entry: self.unknown.name.clone(),
            regex: self.unknown.regex.clone(),
            tag_number: self.unknown.tag_number.clone(),
            settings: self.unknown.settings.clone(),
        })
    }

    pub fn is_release_branch(&self, branch: &str) -> bool {
        self.profile_for(branch).is_release_branch()
    }

    /// Resolve the effective settings for `branch`
    pub fn resolve(
        &self,
        repo: &dyn RepositoryGraph,
        branch: &Branch,
    ) -> Result<EffectiveConfiguration> {
        let mut visited = Vec::new();
        self.resolve_at_depth(repo, branch, 0, &mut visited)
    }

    fn max_recursion(&self) -> usize {
        self.config.max_recursion.unwrap_or(DEFAULT_MAX_RECURSION)
    }

    fn resolve_at_depth(
        &self,
        repo: &dyn RepositoryGraph,
        branch: &Branch,
        depth: usize,
        visited: &mut Vec<String>,
    ) -> Result<EffectiveConfiguration> {
        let friendly = branch.name.friendly().to_string();
        if depth > self.max_recursion() {
            return Err(VersionerError::config(format!(
                "recursion limit of {} exceeded while resolving '{}' (path: {})",
                self.max_recursion(),
                friendly,
                visited.join(" -> ")
            )));
        }

        let profile = self.profile_for(&friendly);
        let mut effective = self.build_effective(branch, &profile);
        debug!(branch = %friendly, entry = %profile.entry, depth, "resolved branch entry");

        if !profile.needs_parent() {
            return Ok(effective);
        }

        visited.push(friendly.clone());
        let parent = self.find_merge_target(repo, branch, &profile, visited)?;
        let Some(parent) = parent else {
            if profile.settings.increment == Some(IncrementStrategy::Inherit) {
                effective.increment = self.global_increment();
            }
            return Ok(effective);
        };

        debug!(branch = %friendly, parent = %parent.name, "following merge target");
        let inherited = self.resolve_at_depth(repo, &parent, depth + 1, visited)?;
        if profile.settings.increment == Some(IncrementStrategy::Inherit) {
            effective.increment = inherited.increment;
            effective.prevent_increment_of_merged_branch_version =
                inherited.prevent_increment_of_merged_branch_version;
        }
        effective.merge_target = Some(parent.name.friendly().to_string());
        Ok(effective)
    }

    /// The branch `branch` was most recently forked from
    ///
    /// Candidates are limited to `source-branches` entries when set. The one
    /// with the newest merge-base wins, then `source-branches` order, then
    /// name. A candidate set made only of branches already on the resolution
    /// path is a cycle.
    fn find_merge_target(
        &self,
        repo: &dyn RepositoryGraph,
        branch: &Branch,
        profile: &BranchProfile,
        visited: &[String],
    ) -> Result<Option<Branch>> {
        let sources = profile.settings.source_branches.clone().unwrap_or_default();
        let friendly = branch.name.friendly();

        let mut permitted = Vec::new();
        for candidate in repo.branches()? {
            let name = candidate.name.friendly();
            if name == friendly {
                continue;
            }
            let entry = self.profile_for(name).entry;
            let rank = if sources.is_empty() {
                Some(0)
            } else {
                sources.iter().position(|s| *s == entry)
            };
            if let Some(rank) = rank {
                permitted.push((candidate, rank));
            }
        }

        let mut scored = Vec::new();
        let mut skipped_visited = Vec::new();
        for (candidate, rank) in permitted {
            let name = candidate.name.friendly().to_string();
            if visited.contains(&name) {
                skipped_visited.push(name);
                continue;
            }
            let Some(base) = repo.merge_base(branch.tip, candidate.tip)? else {
                continue;
            };
            let when = repo.commit(base)?.when;
            scored.push((Reverse(when), rank, name, candidate));
        }

        if scored.is_empty() && !skipped_visited.is_empty() {
            let mut path = visited.to_vec();
            path.push(skipped_visited[0].clone());
            return Err(VersionerError::config(format!(
                "branch inheritance cycle detected: {}",
                path.join(" -> ")
            )));
        }

        scored.sort_by(|a, b| (&a.0, a.1, &a.2).cmp(&(&b.0, b.1, &b.2)));
        Ok(scored.into_iter().next().map(|(_, _, _, candidate)| candidate))
    }

    fn global_increment(&self) -> VersionField {
        match self.config.increment.unwrap_or(IncrementStrategy::Patch) {
            IncrementStrategy::Inherit => VersionField::Patch,
            other => to_field(other),
        }
    }

    fn build_effective(&self, branch: &Branch, profile: &BranchProfile) -> EffectiveConfiguration {
        let s = &profile.settings;
        let c = &self.config;
        let [major, minor, patch, none] = self.bump_messages().map(|(_, p)| p.to_string());

        let increment = match s.increment.or(c.increment) {
            Some(IncrementStrategy::Inherit) | None => self.global_increment(),
            Some(other) => to_field(other),
        };

        EffectiveConfiguration {
            branch_name: branch.name.friendly().to_string(),
            matched_entry: profile.entry.clone(),
            branch_regex: profile.regex.as_str().to_string(),
            mode: s.mode.or(c.mode).unwrap_or_default(),
            tag_prefix: self.tag_prefix_pattern().to_string(),
            label: self.label_for(&branch.name, profile),
            increment,
            increment_mode: s.increment_mode.or(c.increment_mode).unwrap_or_default(),
            prevent_increment_of_merged_branch_version: s
                .prevent_increment_of_merged_branch_version
                .unwrap_or(false),
            track_merge_target: s.track_merge_target.unwrap_or(false),
            tracks_release_branches: s.tracks_release_branches.unwrap_or(false),
            is_release_branch: s.is_release_branch.unwrap_or(false),
            is_mainline: s.is_mainline.unwrap_or(false),
            source_branches: s.source_branches.clone().unwrap_or_default(),
            merge_target: None,
            next_version: c.next_version.clone(),
            continuous_delivery_fallback_tag: c
                .continuous_delivery_fallback_tag
                .clone()
                .unwrap_or_else(|| DEFAULT_FALLBACK_TAG.to_string()),
            major_version_bump_message: major,
            minor_version_bump_message: minor,
            patch_version_bump_message: patch,
            no_bump_message: none,
            commit_message_incrementing: c.commit_message_incrementing.unwrap_or_default(),
            commit_message_convention: c.commit_message_convention.unwrap_or_default(),
            label_number_start: c.label_number_start.unwrap_or(DEFAULT_LABEL_NUMBER_START),
            pre_release_weight: s.pre_release_weight.unwrap_or(0),
            ignore: c.ignore.clone(),
            merge_message_formats: c.merge_message_formats.clone(),
        }
    }

    /// Expand the label template for `name`
    ///
    /// `{BranchName}` becomes the escaped branch name without the entry's
    /// matched prefix; a `tag-number-pattern` match is appended as a number.
    fn label_for(&self, name: &BranchName, profile: &BranchProfile) -> Option<String> {
        let template = profile.settings.tag.clone().unwrap_or_default();
        let mut label = template.replace(
            "{BranchName}",
            &escape_identifier(&name.without_pattern(&profile.regex)),
        );

        let number = profile.tag_number.as_ref().and_then(|re| {
            re.captures(name.friendly())
                .and_then(|caps| caps.name("number"))
                .map(|m| m.as_str().to_string())
        });
        if let Some(number) = number {
            label.push_str(&number);
        }

        if label.is_empty() {
            None
        } else {
            Some(label)
        }
    }
}

fn compile(pattern: &str, what: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| VersionerError::config(format!("invalid regex in {}: {}", what, e)))
}

fn to_field(strategy: IncrementStrategy) -> VersionField {
    strategy.as_field().unwrap_or(VersionField::Patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VersioningMode;
    use crate::git::MockRepository;

    fn resolver() -> ConfigurationResolver {
        ConfigurationResolver::new(GitVersionConfig::default()).unwrap()
    }

    fn head(repo: &MockRepository) -> Branch {
        repo.head().unwrap()
    }

    #[test]
    fn test_main_profile() {
        let mut repo = MockRepository::new();
        repo.add_commits(2);
        let effective = resolver().resolve(&repo, &head(&repo)).unwrap();

        assert_eq!(effective.matched_entry, "main");
        assert_eq!(effective.mode, VersioningMode::ContinuousDelivery);
        assert_eq!(effective.increment, VersionField::Patch);
        assert_eq!(effective.label, None);
        assert!(effective.is_mainline);
    }

    #[test]
    fn test_release_branch_label() {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.create_branch("release/2.0.0");
        repo.checkout("release/2.0.0");

        let effective = resolver().resolve(&repo, &head(&repo)).unwrap();
        assert_eq!(effective.label.as_deref(), Some("beta"));
        assert_eq!(effective.increment, VersionField::None);
        assert!(effective.is_release_branch);
    }

    #[test]
    fn test_feature_inherits_from_develop() {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.create_branch("develop");
        repo.checkout("develop");
        repo.add_commit("dev work");
        repo.create_branch("feature/login-page");
        repo.checkout("feature/login-page");
        repo.add_commit("feature work");

        let effective = resolver().resolve(&repo, &head(&repo)).unwrap();
        assert_eq!(effective.label.as_deref(), Some("login-page"));
        assert_eq!(effective.increment, VersionField::Minor);
        assert_eq!(effective.merge_target.as_deref(), Some("develop"));
    }

    #[test]
    fn test_feature_without_parent_uses_global_increment() {
        let mut repo = MockRepository::new();
        repo.checkout("feature/solo");
        repo.add_commit("orphan");

        let effective = resolver().resolve(&repo, &head(&repo)).unwrap();
        assert_eq!(effective.increment, VersionField::Patch);
        assert_eq!(effective.merge_target, None);
    }

    #[test]
    fn test_pull_request_number_in_label() {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.create_branch("pull/5/merge");
        repo.checkout("pull/5/merge");

        let effective = resolver().resolve(&repo, &head(&repo)).unwrap();
        assert_eq!(effective.label.as_deref(), Some("PullRequest5"));
    }

    #[test]
    fn test_tag_number_pattern_compiled_once_per_entry() {
        let resolver = resolver();
        let pull = resolver.profile_for("pull/7/merge");
        let number = pull.tag_number.as_ref().unwrap();
        assert_eq!(&number.captures("pull/7/merge").unwrap()["number"], "7");
        assert!(resolver.profile_for("main").tag_number.is_none());
    }

    #[test]
    fn test_unknown_branch_profile() {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.create_branch("spike.idea");
        repo.checkout("spike.idea");

        let effective = resolver().resolve(&repo, &head(&repo)).unwrap();
        assert_eq!(effective.matched_entry, UNKNOWN_ENTRY);
        assert_eq!(effective.label.as_deref(), Some("spike-idea"));
        assert_eq!(effective.merge_target.as_deref(), Some("main"));
    }

    #[test]
    fn test_later_entries_override_earlier() {
        let mut config = GitVersionConfig::default();
        config.branches.insert(
            "release-candidates".to_string(),
            BranchConfig {
                regex: Some("^release/.*-rc$".to_string()),
                tag: Some("rc".to_string()),
                ..BranchConfig::default()
            },
        );
        let resolver = ConfigurationResolver::new(config).unwrap();

        let profile = resolver.profile_for("release/2.0.0-rc");
        assert_eq!(profile.entry, "release-candidates");
        assert_eq!(profile.settings.tag.as_deref(), Some("rc"));
        assert_eq!(profile.settings.is_release_branch, Some(true));
    }

    #[test]
    fn test_invalid_branch_regex_is_configuration_error() {
        let mut config = GitVersionConfig::default();
        config.branches.insert(
            "broken".to_string(),
            BranchConfig {
                regex: Some("(unclosed".to_string()),
                ..BranchConfig::default()
            },
        );
        let err = ConfigurationResolver::new(config).err().unwrap();
        assert!(matches!(err, VersionerError::Config(_)));
    }

    #[test]
    fn test_entry_without_regex_is_rejected() {
        let mut config = GitVersionConfig::default();
        config
            .branches
            .insert("nameless".to_string(), BranchConfig::default());
        assert!(ConfigurationResolver::new(config).is_err());
    }

    #[test]
    fn test_mutual_tracking_cycle_is_configuration_error() {
        let mut config = GitVersionConfig::default();
        config.branches.insert(
            "alpha".to_string(),
            BranchConfig {
                regex: Some("^alpha$".to_string()),
                track_merge_target: Some(true),
                source_branches: Some(vec!["beta".to_string()]),
                ..BranchConfig::default()
            },
        );
        config.branches.insert(
            "beta".to_string(),
            BranchConfig {
                regex: Some("^beta$".to_string()),
                track_merge_target: Some(true),
                source_branches: Some(vec!["alpha".to_string()]),
                ..BranchConfig::default()
            },
        );

        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.create_branch("alpha");
        repo.create_branch("beta");
        repo.checkout("alpha");
        repo.add_commit("alpha work");

        let resolver = ConfigurationResolver::new(config).unwrap();
        let err = resolver.resolve(&repo, &head(&repo)).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("alpha -> beta -> alpha"));
    }

    #[test]
    fn test_recursion_limit() {
        let config = GitVersionConfig {
            max_recursion: Some(0),
            ..GitVersionConfig::default()
        };
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.create_branch("feature/a");
        repo.checkout("feature/a");

        let resolver = ConfigurationResolver::new(config).unwrap();
        let err = resolver.resolve(&repo, &head(&repo)).unwrap_err();
        assert!(err.to_string().contains("recursion limit"));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.create_branch("develop");
        repo.create_branch("feature/x");
        repo.checkout("feature/x");
        repo.add_commit("work");

        let resolver = resolver();
        let first = resolver.resolve(&repo, &head(&repo)).unwrap();
        let second = resolver.resolve(&repo, &head(&repo)).unwrap();
        assert_eq!(first, second);
    }
}
