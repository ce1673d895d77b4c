use crate::domain::SemanticVersion;
use crate::error::{Result, VersionerError};
use crate::strategies::{BaseVersion, StrategyContext};

/// The configured `next-version`, as a single non-incrementing candidate
///
/// A value that does not parse is a configuration error.
pub fn candidates(ctx: &StrategyContext<'_>) -> Result<Vec<BaseVersion>> {
    let Some(next) = ctx.config.next_version.as_deref() else {
        return Ok(Vec::new());
    };

    let version = SemanticVersion::parse(next.trim()).map_err(|e| {
        VersionerError::config(format!("next-version '{}' is not a version: {}", next, e))
    })?;
    Ok(vec![BaseVersion::new(
        "NextVersion in configuration",
        false,
        version,
        None,
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GitVersionConfig;
    use crate::git::MockRepository;
    use crate::strategies::fixtures::with_context;

    fn repo() -> MockRepository {
        let mut repo = MockRepository::new();
        repo.add_commit("init");
        repo
    }

    #[test]
    fn test_no_setting_no_candidate() {
        let found = with_context(&repo(), GitVersionConfig::default(), |ctx| {
            candidates(ctx).unwrap()
        });
        assert!(found.is_empty());
    }

    #[test]
    fn test_short_form_is_accepted() {
        let config = GitVersionConfig {
            next_version: Some("2.1".to_string()),
            ..GitVersionConfig::default()
        };
        let found = with_context(&repo(), config, |ctx| candidates(ctx).unwrap());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].version, SemanticVersion::new(2, 1, 0));
        assert!(!found[0].should_increment);
        assert!(found[0].source_commit.is_none());
    }

    #[test]
    fn test_garbage_is_configuration_error() {
        let config = GitVersionConfig {
            next_version: Some("next".to_string()),
            ..GitVersionConfig::default()
        };
        let err = with_context(&repo(), config, |ctx| candidates(ctx).unwrap_err());
        assert!(matches!(err, VersionerError::Config(_)));
    }
}
