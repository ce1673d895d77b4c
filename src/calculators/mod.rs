//! Deployment mode calculators
//!
//! One calculator per [`VersioningMode`]. Each takes the winning base
//! version and its increment decision and produces the final version.

pub mod continuous_delivery;
pub mod continuous_deployment;
pub mod mainline;
pub mod manual;
pub mod trunk_based;

use crate::analyzer::IncrementStrategyFinder;
use crate::config::{ConfigurationResolver, EffectiveConfiguration, VersioningMode};
use crate::domain::{SemanticVersion, TagPrefix, VersionField, VersionTag};
use crate::error::Result;
use crate::git::{Branch, Commit, RepositoryGraph};
use crate::strategies::BaseVersion;

/// The chosen base version with its increment decision applied
#[derive(Debug, Clone)]
pub struct Winner {
    pub base: BaseVersion,
    pub field: VersionField,
    /// `base.version` after applying `field` (when it should increment)
    pub version: SemanticVersion,
    pub commits_since_source: u64,
}

/// Inputs shared by every calculator
pub struct CalculationContext<'a> {
    pub repo: &'a dyn RepositoryGraph,
    pub branch: &'a Branch,
    pub tip: &'a Commit,
    pub config: &'a EffectiveConfiguration,
    pub resolver: &'a ConfigurationResolver,
    pub tag_prefix: &'a TagPrefix,
    pub finder: &'a IncrementStrategyFinder,
    /// Version tags reachable from the tip, oldest first
    pub tags: &'a [VersionTag],
}

impl CalculationContext<'_> {
    /// Does this branch get a pre-release label in its mode?
    pub fn label_applies(&self) -> bool {
        self.config.label.is_some() || self.config.mode == VersioningMode::ContinuousDeployment
    }
}

/// Apply `field` to a candidate that should be incremented
///
/// A release base heading for a pre-release must move past the release, so
/// a `None` field becomes a patch bump there.
pub fn increment_candidate(
    base: &BaseVersion,
    field: VersionField,
    label_applies: bool,
) -> Result<SemanticVersion> {
    if !base.should_increment {
        return Ok(base.version.clone());
    }
    let field = if field == VersionField::None && !base.version.is_pre_release() && label_applies {
        VersionField::Patch
    } else {
        field
    };
    base.version.increment(field)
}

/// Run the calculator selected by the branch's versioning mode
pub fn calculate(ctx: &CalculationContext<'_>, winner: &Winner) -> Result<SemanticVersion> {
    match ctx.config.mode {
        VersioningMode::ContinuousDelivery => continuous_delivery::calculate(ctx, winner),
        VersioningMode::ContinuousDeployment => continuous_deployment::calculate(ctx, winner),
        VersioningMode::Mainline => mainline::calculate(ctx, winner),
        VersioningMode::ManualDeployment => manual::calculate(ctx, winner),
        VersioningMode::TrunkBased => trunk_based::calculate(ctx, winner),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_heading_for_pre_release_bumps_patch() {
        let base = BaseVersion::new("tag", true, SemanticVersion::new(1, 0, 0), None);
        assert_eq!(
            increment_candidate(&base, VersionField::None, true).unwrap(),
            SemanticVersion::new(1, 0, 1)
        );
        assert_eq!(
            increment_candidate(&base, VersionField::None, false).unwrap(),
            SemanticVersion::new(1, 0, 0)
        );
    }

    #[test]
    fn test_non_incrementing_candidate_is_unchanged() {
        let base = BaseVersion::new("next", false, SemanticVersion::new(2, 0, 0), None);
        assert_eq!(
            increment_candidate(&base, VersionField::Major, true).unwrap(),
            SemanticVersion::new(2, 0, 0)
        );
    }
}
