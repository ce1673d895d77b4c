use crate::calculators::mainline::{off_mainline, replay, ReplayRules};
use crate::calculators::{CalculationContext, Winner};
use crate::domain::SemanticVersion;
use crate::error::Result;

const TRUNK_RULES: ReplayRules = ReplayRules {
    adopt_release_merges: false,
    merged_branch_increment: false,
};

/// Trunk based: every trunk commit is an implicit release
///
/// Each first-parent commit on the trunk bumps by its own markers (a merge
/// by the markers of everything it merged). Other branches take the trunk
/// version at their fork point and only get a pre-release when their branch
/// entry configures a label.
pub fn calculate(ctx: &CalculationContext<'_>, winner: &Winner) -> Result<SemanticVersion> {
    if ctx.config.is_mainline {
        return match winner.base.source_commit.as_ref() {
            Some(source) => Ok(replay(
                ctx,
                &winner.base.version,
                source.id,
                ctx.tip.id,
                TRUNK_RULES,
            )?
            .to_release()),
            None => Ok(winner.version.to_release()),
        };
    }
    off_mainline(ctx, winner, TRUNK_RULES, ctx.config.label.clone())
}
