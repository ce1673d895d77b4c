use crate::calculators::{CalculationContext, Winner};
use crate::domain::{PreReleaseTag, SemanticVersion, VersionField};
use crate::error::Result;
use crate::git::{ancestry, first_parent_history, Branch, Commit};
use crate::strategies::merge_message::MergeMessageParser;
use git2::Oid;
use std::cmp::Reverse;
use tracing::debug;

/// How merges are treated while replaying history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReplayRules {
    /// Merging a release branch with a higher version jumps to that version
    pub adopt_release_merges: bool,
    /// A merge bumps at least by the merged branch's configured increment
    pub merged_branch_increment: bool,
}

const MAINLINE_RULES: ReplayRules = ReplayRules {
    adopt_release_merges: true,
    merged_branch_increment: true,
};

/// Mainline: the version is the base replayed forward over every commit
/// and merge on the mainline since the source
///
/// Branches off the mainline take the mainline version at their fork point,
/// bump it by their own increment and carry a pre-release label numbered by
/// their commits.
pub fn calculate(ctx: &CalculationContext<'_>, winner: &Winner) -> Result<SemanticVersion> {
    if ctx.config.is_mainline {
        let Some(source) = winner.base.source_commit.as_ref() else {
            return Ok(winner.version.to_release());
        };
        let replayed = replay(ctx, &winner.base.version, source.id, ctx.tip.id, MAINLINE_RULES)?;
        return Ok(replayed.to_release());
    }
    off_mainline(ctx, winner, MAINLINE_RULES, Some(ctx.config.label_or_fallback()))
}

/// Apply the increment of every first-parent commit in `source..to` to
/// `start`, oldest first
///
/// A pre-release `start` is heading for its own release, so the first bump
/// lands on that release. It comes back unchanged when nothing bumps.
pub(crate) fn replay(
    ctx: &CalculationContext<'_>,
    start: &SemanticVersion,
    source: Oid,
    to: Oid,
    rules: ReplayRules,
) -> Result<SemanticVersion> {
    let parser = MergeMessageParser::new(&ctx.config.merge_message_formats)?;
    let stop = ancestry(ctx.repo, Some(source))?;
    let mut version = start.clone();

    for commit in first_parent_history(ctx.repo, to, &stop)? {
        let next = step(ctx, &parser, &commit, &version, rules)?;
        debug!(commit = %commit.short_sha(), from = %version, to = %next, "replayed commit");
        version = next;
    }
    Ok(version)
}

fn step(
    ctx: &CalculationContext<'_>,
    parser: &MergeMessageParser,
    commit: &Commit,
    version: &SemanticVersion,
    rules: ReplayRules,
) -> Result<SemanticVersion> {
    let (Some(&mainline_parent), Some(&merged_parent)) =
        (commit.parents.first(), commit.parents.get(1))
    else {
        return version.bump_release(ctx.finder.field_for_commit(commit));
    };

    let merge = parser.parse(&commit.message, ctx.tag_prefix);
    if rules.adopt_release_merges {
        if let Some(merge) = &merge {
            let released = merge
                .version
                .as_ref()
                .filter(|_| ctx.resolver.is_release_branch(merge.merged_branch.friendly()));
            if let Some(released) = released.filter(|v| v.to_release() > *version) {
                return Ok(released.to_release());
            }
        }
    }

    let mut merged = ctx.repo.commits_reachable(merged_parent, Some(mainline_parent))?;
    merged.push(commit.clone());
    let mut field = ctx.finder.field_for_commits(&merged);
    if rules.merged_branch_increment && field != VersionField::None {
        if let Some(merge) = &merge {
            field = field.max(branch_increment(ctx, merge.merged_branch.friendly()));
        }
    }
    version.bump_release(field)
}

/// Configured increment of the branch entry `name` falls under
fn branch_increment(ctx: &CalculationContext<'_>, name: &str) -> VersionField {
    ctx.resolver
        .profile_for(name)
        .settings
        .increment
        .and_then(|i| i.as_field())
        .unwrap_or_else(|| ctx.finder.default_field())
}

/// The mainline branch the current branch was forked from, and the fork
/// point
///
/// The merge target wins when it is a mainline branch; otherwise the
/// mainline branch with the newest merge-base.
pub(crate) fn find_mainline(ctx: &CalculationContext<'_>) -> Result<Option<(Branch, Commit)>> {
    let mut found = Vec::new();
    for branch in ctx.repo.branches()? {
        let name = branch.name.friendly().to_string();
        if name == ctx.branch.name.friendly() {
            continue;
        }
        if ctx.resolver.profile_for(&name).settings.is_mainline != Some(true) {
            continue;
        }
        let Some(base) = ctx.repo.merge_base(ctx.tip.id, branch.tip)? else {
            continue;
        };
        let base = ctx.repo.commit(base)?;
        let preferred = ctx.config.merge_target.as_deref() == Some(name.as_str());
        found.push((!preferred, Reverse(base.when), name, branch, base));
    }
    found.sort_by(|a, b| (a.0, &a.1, &a.2).cmp(&(b.0, &b.1, &b.2)));
    Ok(found
        .into_iter()
        .next()
        .map(|(_, _, _, branch, base)| (branch, base)))
}

/// Version of a branch off the mainline
///
/// `label` of `None` yields a release version.
pub(crate) fn off_mainline(
    ctx: &CalculationContext<'_>,
    winner: &Winner,
    rules: ReplayRules,
    label: Option<String>,
) -> Result<SemanticVersion> {
    let (fork, start) = match find_mainline(ctx)? {
        Some((mainline, fork)) => {
            debug!(mainline = %mainline.name, fork = %fork.short_sha(), "found mainline fork point");
            let start = mainline_version_at(ctx, winner, &fork, rules)?;
            (Some(fork.id), start)
        }
        None => {
            let start = match winner.base.source_commit.as_ref() {
                Some(source) => replay(ctx, &winner.base.version, source.id, ctx.tip.id, rules)?,
                None => winner.base.version.clone(),
            };
            (winner.base.source_commit.as_ref().map(|c| c.id), start)
        }
    };

    let branch_commits = ctx.repo.commits_reachable(ctx.tip.id, fork)?;
    let mut field = ctx.finder.field_for_commits(&branch_commits);
    if field == VersionField::None && label.is_some() {
        field = VersionField::Patch;
    }
    let version = start.bump_release(field)?;

    Ok(match label {
        Some(label) => version.with_pre_release(Some(PreReleaseTag::new(
            label,
            Some(branch_commits.len() as u64),
        ))),
        None => version.to_release(),
    })
}

fn mainline_version_at(
    ctx: &CalculationContext<'_>,
    winner: &Winner,
    fork: &Commit,
    rules: ReplayRules,
) -> Result<SemanticVersion> {
    match winner.base.source_commit.as_ref() {
        Some(source) if ancestry(ctx.repo, Some(fork.id))?.contains(&source.id) => {
            replay(ctx, &winner.base.version, source.id, fork.id, rules)
        }
        _ => Ok(winner.base.version.clone()),
    }
}
