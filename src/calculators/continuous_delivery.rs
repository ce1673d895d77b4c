use crate::calculators::{CalculationContext, Winner};
use crate::domain::{PreReleaseTag, SemanticVersion, VersionTag};
use crate::error::{Result, VersionerError};
use crate::git::count_commits_since;

/// Continuous delivery: a release on unlabelled branches, otherwise a
/// pre-release numbered from the last matching pre-release tag
///
/// The number is the tag's number plus the commits made since it. Without
/// such a tag the base's own matching number is kept, or numbering starts at
/// `label-number-start`; commits then only show up in build metadata.
pub fn calculate(ctx: &CalculationContext<'_>, winner: &Winner) -> Result<SemanticVersion> {
    let Some(label) = ctx.config.label.as_deref() else {
        return Ok(winner.version.to_release());
    };

    if let Some(tag) = latest_matching_tag(ctx, &winner.version) {
        let since = count_commits_since(ctx.repo, ctx.tip.id, Some(tag.commit))?;
        let number = tag
            .version
            .pre_release
            .as_ref()
            .and_then(|p| p.number)
            .unwrap_or(0)
            .checked_add(since)
            .ok_or_else(|| {
                VersionerError::version(format!("Pre-release number after '{}' overflows", tag.name))
            })?;
        return Ok(winner
            .version
            .with_pre_release(Some(PreReleaseTag::new(label, Some(number)))));
    }

    let number = winner
        .version
        .pre_release
        .as_ref()
        .filter(|p| p.matches_label(label))
        .and_then(|p| p.number)
        .unwrap_or(ctx.config.label_number_start);
    Ok(winner
        .version
        .with_pre_release(Some(PreReleaseTag::new(label, Some(number)))))
}

/// Most recent reachable pre-release tag for the same release with this
/// branch's label
fn latest_matching_tag<'t>(
    ctx: &'t CalculationContext<'_>,
    version: &SemanticVersion,
) -> Option<&'t VersionTag> {
    ctx.tags.iter().rev().find(|tag| {
        tag.version.major_minor_patch() == version.major_minor_patch()
            && tag
                .version
                .pre_release
                .as_ref()
                .is_some_and(|p| ctx.config.matches_label(p))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculators::fixtures::{tag_base, with_winner};
    use crate::config::GitVersionConfig;
    use crate::git::MockRepository;

    #[test]
    fn test_main_gets_patch_release() {
        let mut repo = MockRepository::new();
        let tagged = repo.add_commit("init");
        repo.add_tag("1.0.3");
        repo.add_commits(5);

        let version = with_winner(
            &repo,
            GitVersionConfig::default(),
            |r| tag_base(r, "1.0.3", tagged),
            |ctx, winner| {
                assert_eq!(winner.commits_since_source, 5);
                calculate(ctx, winner).unwrap()
            },
        );
        assert_eq!(version.to_string(), "1.0.4");
    }

    #[test]
    fn test_counts_from_matching_pre_release_tag() {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo.create_branch("release/2.0.0");
        repo.checkout("release/2.0.0");
        let tagged = repo.add_commit("stabilise");
        repo.add_tag("2.0.0-beta.1");
        repo.add_commits(2);

        let version = with_winner(
            &repo,
            GitVersionConfig::default(),
            |r| tag_base(r, "2.0.0-beta.1", tagged),
            |ctx, winner| calculate(ctx, winner).unwrap(),
        );
        assert_eq!(version.to_string(), "2.0.0-beta.3");
    }

    #[test]
    fn test_starts_at_label_number_start() {
        let mut repo = MockRepository::new();
        let tagged = repo.add_commit("init");
        repo.add_tag("1.0.0");
        repo.create_branch("release/1.1.0");
        repo.checkout("release/1.1.0");
        repo.add_commits(3);

        let version = with_winner(
            &repo,
            GitVersionConfig::default(),
            |r| tag_base(r, "1.0.0", tagged),
            |ctx, winner| calculate(ctx, winner).unwrap(),
        );
        assert_eq!(version.to_string(), "1.0.1-beta.1");
    }
}
