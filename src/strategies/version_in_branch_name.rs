use crate::error::Result;
use crate::strategies::{branch_point, BaseVersion, StrategyContext};

/// The version a release branch is named after (`release/2.0.0`)
///
/// Sourced at the commit the branch was forked from, and never
/// incremented: the name already states the target release.
pub fn candidates(ctx: &StrategyContext<'_>) -> Result<Vec<BaseVersion>> {
    if !ctx.config.is_release_branch {
        return Ok(Vec::new());
    }
    let Some(version) = ctx.branch.name.embedded_version(ctx.tag_prefix) else {
        return Ok(Vec::new());
    };

    let source = branch_point(ctx.repo, ctx.branch)?;
    Ok(vec![BaseVersion::new(
        format!("Version in branch name '{}'", ctx.branch.name.friendly()),
        false,
        version,
        source,
    )])
}
