use crate::domain::SemanticVersion;
use crate::error::Result;
use crate::git::root_commit;
use crate::strategies::{BaseVersion, StrategyContext};

/// Version assumed for a history without any usable candidate
pub fn fallback_version() -> SemanticVersion {
    SemanticVersion::new(0, 1, 0)
}

/// `0.1.0` sourced at the oldest root commit
///
/// Only consulted when no other candidate survives filtering.
pub fn candidate(ctx: &StrategyContext<'_>) -> Result<BaseVersion> {
    let root = root_commit(ctx.repo, ctx.tip.id)?;
    Ok(BaseVersion::new(
        "Fallback base version",
        false,
        fallback_version(),
        root,
    ))
}
