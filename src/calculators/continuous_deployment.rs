use crate::calculators::{CalculationContext, Winner};
use crate::domain::{PreReleaseTag, SemanticVersion};
use crate::error::{Result, VersionerError};

/// Continuous deployment: every commit is a deployable pre-release
///
/// The label is the branch label or the fallback tag; the number counts the
/// commits since the version source, continuing from the source tag's own
/// number when it carries the same label.
pub fn calculate(ctx: &CalculationContext<'_>, winner: &Winner) -> Result<SemanticVersion> {
    let label = ctx.config.label_or_fallback();
    let carried = winner
        .base
        .version
        .pre_release
        .as_ref()
        .filter(|p| p.matches_label(&label))
        .and_then(|p| p.number)
        .unwrap_or(0);

    let number = carried
        .checked_add(winner.commits_since_source)
        .ok_or_else(|| VersionerError::version(format!("Pre-release number of '{}' overflows", label)))?;
    Ok(winner
        .version
        .with_pre_release(Some(PreReleaseTag::new(label, Some(number)))))
}
