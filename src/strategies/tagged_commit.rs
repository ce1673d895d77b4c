use crate::domain::VersionTag;
use crate::error::Result;
use crate::git::{ancestry, Commit, RepositoryGraph};
use crate::strategies::{BaseVersion, StrategyContext};
use git2::Oid;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Version tags reachable from the tip, highest tag per tagged commit
///
/// Tags dated after the tip commit are ignored. A tag on the tip itself is
/// taken as-is; any other tag is a base to increment from.
pub fn candidates(ctx: &StrategyContext<'_>) -> Result<Vec<BaseVersion>> {
    let reachable = ancestry(ctx.repo, Some(ctx.tip.id))?;
    let tags = version_tags(ctx, &reachable)?;

    let mut candidates = Vec::new();
    for tag in tags {
        let commit = ctx.repo.commit(tag.commit)?;
        if commit.when > ctx.tip.when {
            debug!(tag = %tag.name, "skipping tag newer than the tip");
            continue;
        }
        let should_increment = tag.commit != ctx.tip.id;
        candidates.push(BaseVersion::new(
            format!("Git tag '{}'", tag.name),
            should_increment,
            tag.version,
            Some(commit),
        ));
    }

    if ctx.config.track_merge_target {
        candidates.extend(merge_target_tags(ctx, &reachable)?);
    }
    Ok(candidates)
}

/// Highest version tag on each commit in `within`, oldest commit first
fn version_tags(ctx: &StrategyContext<'_>, within: &HashSet<Oid>) -> Result<Vec<VersionTag>> {
    let mut by_commit: BTreeMap<String, VersionTag> = BTreeMap::new();
    for tag in ctx.repo.tags()? {
        if !within.contains(&tag.target) {
            continue;
        }
        let Some(parsed) = ctx.tag_prefix.version_tag(&tag.name, tag.target) else {
            debug!(tag = %tag.name, prefix = ctx.tag_prefix.pattern(), "tag is not a version");
            continue;
        };
        let key = tag.target.to_string();
        match by_commit.get(&key) {
            Some(existing) if existing.version >= parsed.version => {}
            _ => {
                by_commit.insert(key, parsed);
            }
        }
    }

    let mut tags: Vec<VersionTag> = by_commit.into_values().collect();
    let mut dated = Vec::with_capacity(tags.len());
    for tag in tags.drain(..) {
        let when = ctx.repo.commit(tag.commit)?.when;
        dated.push((when, tag));
    }
    dated.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.name.cmp(&b.1.name)));
    Ok(dated.into_iter().map(|(_, tag)| tag).collect())
}

/// Tags on merge commits of the merge target that brought this branch's
/// history in, sourced at the merged parent
fn merge_target_tags(ctx: &StrategyContext<'_>, reachable: &HashSet<Oid>) -> Result<Vec<BaseVersion>> {
    let Some(target_name) = ctx.config.merge_target.as_deref() else {
        return Ok(Vec::new());
    };
    let Some(target) = ctx.repo.find_branch(target_name)? else {
        return Ok(Vec::new());
    };

    let target_history: HashSet<Oid> = ctx
        .repo
        .commits_reachable(target.tip, None)?
        .into_iter()
        .filter(|c| c.is_merge() && !reachable.contains(&c.id))
        .map(|c| c.id)
        .collect();
    let tags = version_tags(ctx, &target_history)?;

    let mut candidates = Vec::new();
    for tag in tags {
        let merge = ctx.repo.commit(tag.commit)?;
        let Some(source) = merged_parent(ctx.repo, &merge, reachable)? else {
            continue;
        };
        candidates.push(BaseVersion::new(
            format!("Git tag '{}' on merge target '{}'", tag.name, target_name),
            true,
            tag.version,
            Some(source),
        ));
    }
    Ok(candidates)
}

fn merged_parent(
    repo: &dyn RepositoryGraph,
    merge: &Commit,
    reachable: &HashSet<Oid>,
) -> Result<Option<Commit>> {
    // merged-in side first
    match merge.parents.iter().rev().find(|p| reachable.contains(p)) {
        Some(parent) => Ok(Some(repo.commit(*parent)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GitVersionConfig;
    use crate::domain::SemanticVersion;
    use crate::git::MockRepository;
    use crate::strategies::fixtures::with_context;

    fn run(repo: &MockRepository) -> Vec<BaseVersion> {
        with_context(repo, GitVersionConfig::default(), |ctx| candidates(ctx).unwrap())
    }

    #[test]
    fn test_tag_with_prefix_parses() {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.add_tag("v1.2.3");
        repo.add_commit("next");

        let found = run(&repo);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].version, SemanticVersion::new(1, 2, 3));
        assert!(found[0].should_increment);
        assert_eq!(found[0].source, "Git tag 'v1.2.3'");
    }

    #[test]
    fn test_non_version_tags_are_ignored() {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.add_tag("nightly");
        repo.add_tag("release-candidate");

        assert!(run(&repo).is_empty());
    }

    #[test]
    fn test_tag_on_tip_does_not_increment() {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.add_tag("1.0.3");

        let found = run(&repo);
        assert!(!found[0].should_increment);
    }

    #[test]
    fn test_highest_tag_per_commit() {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.add_tag("1.0.0");
        repo.add_tag("1.1.0");
        repo.add_commit("next");

        let found = run(&repo);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].version, SemanticVersion::new(1, 1, 0));
    }

    #[test]
    fn test_unreachable_tags_are_ignored() {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.create_branch("feature/x");
        repo.checkout("feature/x");
        repo.add_commit("feature");
        repo.add_tag("9.9.9");
        repo.checkout("main");
        repo.add_commit("main");

        assert!(run(&repo).is_empty());
    }

    #[test]
    fn test_merge_target_tags() {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.create_branch("develop");
        repo.checkout("develop");
        let dev = repo.add_commit("develop work");
        repo.checkout("main");
        repo.merge("develop", "Merge branch 'develop'");
        repo.add_tag("2.0.0");
        repo.checkout("develop");
        repo.add_commit("after release");

        let found = run(&repo);
        let from_target: Vec<&BaseVersion> =
            found.iter().filter(|c| c.source.contains("merge target")).collect();
        assert_eq!(from_target.len(), 1);
        assert_eq!(from_target[0].version, SemanticVersion::new(2, 0, 0));
        assert_eq!(from_target[0].source_commit.as_ref().map(|c| c.id), Some(dev));
    }
}
