use crate::domain::{BranchName, SemanticVersion, TagPrefix};
use crate::error::Result;
use crate::strategies::{BaseVersion, StrategyContext};
use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

/// Merge message formats recognised out of the box, tried in this order
/// after any configured ones. Custom formats use the same group names.
pub const DEFAULT_FORMATS: [(&str, &str); 8] = [
    (
        "Default",
        r"^Merge (branch|tag) '(?P<source_branch>[^']*)'(?: into (?P<target_branch>[^\s]*))*",
    ),
    (
        "SmartGit",
        r"^Finish (?P<source_branch>[^\s]*)(?: into (?P<target_branch>[^\s]*))*",
    ),
    (
        "BitBucketPull",
        r"^Merge pull request #(?P<pull_request_number>\d+) (from|in) (?P<source>.*) from (?P<source_branch>[^\s]*) to (?P<target_branch>[^\s]*)",
    ),
    (
        "BitBucketPullv7",
        r"^Pull request #(?P<pull_request_number>\d+).*\r?\n\r?\nMerge in (?P<source>.*) from (?P<source_branch>[^\s]*) to (?P<target_branch>[^\s]*)",
    ),
    (
        "GitHubPull",
        r"^Merge pull request #(?P<pull_request_number>\d+) (from|in) (?:[^\s/]+/)?(?P<source_branch>[^\s]*)(?: into (?P<target_branch>[^\s]*))*",
    ),
    (
        "RemoteTracking",
        r"^Merge remote-tracking branch '(?P<source_branch>[^\s]*)'(?: into (?P<target_branch>[^\s]*))*",
    ),
    (
        "TfsMergeMessage",
        r"^Merge (?P<source_branch>[^\s]*) to (?P<target_branch>[^\s]*)",
    ),
    (
        "BitBucketCloudPull",
        r"^Merged in (?P<source_branch>[^\s]*) \(pull request #(?P<pull_request_number>\d+)\)",
    ),
];

/// What a merge commit message says about the merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeMessage {
    pub format: String,
    pub merged_branch: BranchName,
    pub target_branch: Option<String>,
    pub pull_request_number: Option<u64>,
    /// Version embedded in the merged branch name
    pub version: Option<SemanticVersion>,
}

/// Compiled merge message formats, configured ones first
pub struct MergeMessageParser {
    formats: Vec<(String, Regex)>,
}

impl MergeMessageParser {
    pub fn new(custom: &IndexMap<String, String>) -> Result<Self> {
        let mut formats = Vec::new();
        for (name, pattern) in custom {
            formats.push((name.clone(), Regex::new(pattern)?));
        }
        for (name, pattern) in DEFAULT_FORMATS {
            formats.push((name.to_string(), Regex::new(pattern)?));
        }
        Ok(MergeMessageParser { formats })
    }

    /// Parse a merge commit message with the first format that matches
    pub fn parse(&self, message: &str, prefix: &TagPrefix) -> Option<MergeMessage> {
        self.formats.iter().find_map(|(name, regex)| {
            let caps = regex.captures(message)?;
            let merged = caps.name("source_branch")?.as_str();
            let merged_branch = BranchName::new(merged.strip_prefix("origin/").unwrap_or(merged));
            let version = merged_branch.embedded_version(prefix);
            Some(MergeMessage {
                format: name.clone(),
                target_branch: caps.name("target_branch").map(|m| m.as_str().to_string()),
                pull_request_number: caps
                    .name("pull_request_number")
                    .and_then(|m| m.as_str().parse().ok()),
                merged_branch,
                version,
            })
        })
    }
}

/// Versions of release branches merged into the current history
///
/// Only merge commits count, and only when the merged branch is a release
/// branch under the configuration. The candidate is sourced at the merge.
pub fn candidates(ctx: &StrategyContext<'_>) -> Result<Vec<BaseVersion>> {
    let parser = MergeMessageParser::new(&ctx.config.merge_message_formats)?;
    let mut candidates = Vec::new();

    for commit in ctx.repo.commits_reachable(ctx.tip.id, None)? {
        if !commit.is_merge() {
            continue;
        }
        let Some(merge) = parser.parse(&commit.message, ctx.tag_prefix) else {
            continue;
        };
        let Some(version) = merge.version.clone() else {
            continue;
        };
        if !ctx.resolver.is_release_branch(merge.merged_branch.friendly()) {
            debug!(branch = %merge.merged_branch, "merged branch is not a release branch");
            continue;
        }

        candidates.push(BaseVersion::new(
            format!("Merge message '{}'", commit.message.lines().next().unwrap_or("").trim()),
            !ctx.config.prevent_increment_of_merged_branch_version,
            version,
            Some(commit),
        ));
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GitVersionConfig;
    use crate::git::MockRepository;
    use crate::strategies::fixtures::with_context;

    fn parser() -> MergeMessageParser {
        MergeMessageParser::new(&IndexMap::new()).unwrap()
    }

    fn prefix() -> TagPrefix {
        TagPrefix::new("[vV]").unwrap()
    }

    #[test]
    fn test_default_git_message() {
        let merge = parser()
            .parse("Merge branch 'release-2.0.0' into main", &prefix())
            .unwrap();
        assert_eq!(merge.format, "Default");
        assert_eq!(merge.merged_branch.as_str(), "release-2.0.0");
        assert_eq!(merge.target_branch.as_deref(), Some("main"));
        assert_eq!(merge.version, Some(SemanticVersion::new(2, 0, 0)));
    }

    #[test]
    fn test_github_pull_request_message() {
        let merge = parser()
            .parse("Merge pull request #42 from acme/release/1.4.0", &prefix())
            .unwrap();
        assert_eq!(merge.format, "GitHubPull");
        assert_eq!(merge.pull_request_number, Some(42));
        assert_eq!(merge.merged_branch.as_str(), "release/1.4.0");
        assert_eq!(merge.version, Some(SemanticVersion::new(1, 4, 0)));
    }

    #[test]
    fn test_remote_tracking_strips_origin() {
        let merge = parser()
            .parse("Merge remote-tracking branch 'origin/release/3.1.0'", &prefix())
            .unwrap();
        assert_eq!(merge.merged_branch.as_str(), "release/3.1.0");
    }

    #[test]
    fn test_bitbucket_cloud_message() {
        let merge = parser()
            .parse("Merged in release/0.9.0 (pull request #7)", &prefix())
            .unwrap();
        assert_eq!(merge.format, "BitBucketCloudPull");
        assert_eq!(merge.pull_request_number, Some(7));
    }

    #[test]
    fn test_custom_format_takes_precedence() {
        let mut custom = IndexMap::new();
        custom.insert(
            "Landed".to_string(),
            r"^Landed (?P<source_branch>\S+)".to_string(),
        );
        let parser = MergeMessageParser::new(&custom).unwrap();
        let merge = parser.parse("Landed release/5.0.0", &prefix()).unwrap();
        assert_eq!(merge.format, "Landed");
        assert_eq!(merge.version, Some(SemanticVersion::new(5, 0, 0)));
    }

    #[test]
    fn test_plain_message_is_not_a_merge() {
        assert!(parser().parse("fix: typo", &prefix()).is_none());
    }

    #[test]
    fn test_release_branch_merge_yields_candidate() {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.create_branch("release-2.0.0");
        repo.checkout("release-2.0.0");
        repo.add_commit("stabilise");
        repo.checkout("main");
        let merge = repo.merge("release-2.0.0", "Merge branch 'release-2.0.0'");

        let found = with_context(&repo, GitVersionConfig::default(), |ctx| {
            candidates(ctx).unwrap()
        });
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].version, SemanticVersion::new(2, 0, 0));
        assert!(!found[0].should_increment);
        assert_eq!(found[0].source_commit.as_ref().map(|c| c.id), Some(merge));
    }

    #[test]
    fn test_feature_merge_is_ignored() {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.create_branch("feature/1.5.0-ui");
        repo.checkout("feature/1.5.0-ui");
        repo.add_commit("ui");
        repo.checkout("main");
        repo.merge("feature/1.5.0-ui", "Merge branch 'feature/1.5.0-ui'");

        let found = with_context(&repo, GitVersionConfig::default(), |ctx| {
            candidates(ctx).unwrap()
        });
        assert!(found.is_empty());
    }
}
