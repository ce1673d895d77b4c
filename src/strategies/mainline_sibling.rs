use crate::error::Result;
use crate::strategies::{BaseVersion, StrategyContext};

/// Versions of the release branches a branch tracks
///
/// A branch configured with `tracks-release-branches` (develop by default)
/// must stay ahead of every open release branch, so each release branch's
/// embedded version becomes an incrementing candidate sourced at the
/// merge-base with the current branch.
pub fn candidates(ctx: &StrategyContext<'_>) -> Result<Vec<BaseVersion>> {
    if !ctx.config.tracks_release_branches {
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    for sibling in ctx.repo.branches()? {
        let name = sibling.name.friendly();
        if name == ctx.branch.name.friendly() || !ctx.resolver.is_release_branch(name) {
            continue;
        }
        let Some(version) = sibling.name.embedded_version(ctx.tag_prefix) else {
            continue;
        };
        let source = match ctx.repo.merge_base(ctx.tip.id, sibling.tip)? {
            Some(base) => Some(ctx.repo.commit(base)?),
            None => None,
        };
        candidates.push(BaseVersion::new(
            format!("Release branch '{}'", name),
            true,
            version,
            source,
        ));
    }
    Ok(candidates)
}
