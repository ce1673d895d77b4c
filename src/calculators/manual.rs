use crate::calculators::{CalculationContext, Winner};
use crate::domain::{PreReleaseTag, SemanticVersion};
use crate::error::Result;

/// Manual deployment: the incremented base, nothing more
///
/// Labelled branches get their label without a number unless the base
/// already carries a matching pre-release; numbering is left to whoever
/// tags the release.
pub fn calculate(ctx: &CalculationContext<'_>, winner: &Winner) -> Result<SemanticVersion> {
    let Some(label) = ctx.config.label.as_deref() else {
        return Ok(winner.version.to_release());
    };

    let keeps_own = winner
        .version
        .pre_release
        .as_ref()
        .is_some_and(|p| p.matches_label(label));
    if keeps_own {
        return Ok(winner.version.clone());
    }
    Ok(winner
        .version
        .with_pre_release(Some(PreReleaseTag::new(label, None))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculators::fixtures::{tag_base, with_winner};
    use crate::config::{GitVersionConfig, VersioningMode};
    use crate::git::MockRepository;

    fn manual() -> GitVersionConfig {
        GitVersionConfig {
            mode: Some(VersioningMode::ManualDeployment),
            ..GitVersionConfig::default()
        }
    }

    #[test]
    fn test_release_branch_keeps_plain_label() {
        let mut repo = MockRepository::new();
        let tagged = repo.add_commit("init");
        repo.add_tag("1.4.0");
        repo.create_branch("hotfix/crash");
        repo.checkout("hotfix/crash");
        repo.add_commits(3);

        let version = with_winner(
            &repo,
            manual(),
            |r| tag_base(r, "1.4.0", tagged),
            |ctx, winner| calculate(ctx, winner).unwrap(),
        );
        assert_eq!(version.to_string(), "1.4.1-beta");
    }

    #[test]
    fn test_matching_pre_release_is_kept() {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.create_branch("hotfix/crash");
        repo.checkout("hotfix/crash");
        let tagged = repo.add_commit("fix");
        repo.add_tag("1.4.1-beta.2");
        repo.add_commit("more");

        let version = with_winner(
            &repo,
            manual(),
            |r| tag_base(r, "1.4.1-beta.2", tagged),
            |ctx, winner| calculate(ctx, winner).unwrap(),
        );
        assert_eq!(version.to_string(), "1.4.1-beta.3");
    }

    #[test]
    fn test_main_is_a_release() {
        let mut repo = MockRepository::new();
        let tagged = repo.add_commit("init");
        repo.add_tag("1.4.0");
        repo.add_commit("+semver: minor");

        let version = with_winner(
            &repo,
            manual(),
            |r| tag_base(r, "1.4.0", tagged),
            |ctx, winner| calculate(ctx, winner).unwrap(),
        );
        assert_eq!(version.to_string(), "1.5.0");
    }
}
