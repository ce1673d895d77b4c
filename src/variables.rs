//! The canonical variable set rendered from a computed version
//!
//! Every value is plain string composition over the [`SemanticVersion`]
//! and its build metadata. The map keeps a fixed key order so that renders
//! and cache entries are byte-stable.

use crate::config::EffectiveConfiguration;
use crate::diagnostics::Diagnostic;
use crate::domain::{escape_identifier, SemanticVersion};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Digits used by the padded renderings
pub const PADDING: usize = 4;

/// Weighted number reported for versions without a pre-release
const RELEASE_WEIGHT: u64 = 60000;

/// Ordered name -> value map handed to output layers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionVariables(IndexMap<String, String>);

impl VersionVariables {
    /// Render every variable for `version`
    pub fn from_version(version: &SemanticVersion, config: &EffectiveConfiguration) -> Self {
        let build = &version.build;
        let pre = version.pre_release.as_ref().filter(|p| p.has_tag());
        let commits = build.commits_since_version_source;

        let major_minor_patch = version.major_minor_patch();
        let pre_release_tag = pre.map(ToString::to_string).unwrap_or_default();
        let with_dash = |s: &str| if s.is_empty() { String::new() } else { format!("-{}", s) };

        let semver = format!("{}{}", major_minor_patch, with_dash(&pre_release_tag));
        let legacy = format!(
            "{}{}",
            major_minor_patch,
            with_dash(&pre.map(|p| p.to_legacy_string()).unwrap_or_default())
        );
        let padded_pre = pre
            .map(|p| p.to_legacy_padded_string(PADDING))
            .unwrap_or_default();
        let legacy_padded = format!("{}{}", major_minor_patch, with_dash(&padded_pre));

        let branch = build.branch.clone().unwrap_or_default();
        let escaped_branch = escape_identifier(&branch);
        let sha = build.sha.clone().unwrap_or_default();
        let short_sha = build.short_sha.clone().unwrap_or_default();

        let build_meta = if commits > 0 {
            commits.to_string()
        } else {
            String::new()
        };
        let build_meta_padded = if commits > 0 {
            format!("{:0width$}", commits, width = PADDING)
        } else {
            String::new()
        };
        let full_build_meta = {
            let mut parts = Vec::new();
            if commits > 0 {
                parts.push(commits.to_string());
            }
            if !escaped_branch.is_empty() {
                parts.push(format!("Branch.{}", escaped_branch));
            }
            if !sha.is_empty() {
                parts.push(format!("Sha.{}", sha));
            }
            parts.join(".")
        };
        let full_semver = if commits > 0 {
            format!("{}+{}", semver, commits)
        } else {
            semver.clone()
        };
        let informational = if full_build_meta.is_empty() {
            semver.clone()
        } else {
            format!("{}+{}", semver, full_build_meta)
        };
        let weighted = match pre {
            Some(p) => p.number.unwrap_or(0) + config.pre_release_weight,
            None => RELEASE_WEIGHT,
        };

        let mut vars = IndexMap::new();
        let mut put = |name: &str, value: String| {
            vars.insert(name.to_string(), value);
        };
        put("Major", version.major.to_string());
        put("Minor", version.minor.to_string());
        put("Patch", version.patch.to_string());
        put("PreReleaseTag", pre_release_tag.clone());
        put("PreReleaseTagWithDash", with_dash(&pre_release_tag));
        put("PreReleaseLabel", pre.map(|p| p.name.clone()).unwrap_or_default());
        put(
            "PreReleaseLabelWithDash",
            with_dash(&pre.map(|p| p.name.clone()).unwrap_or_default()),
        );
        put(
            "PreReleaseNumber",
            pre.and_then(|p| p.number).map(|n| n.to_string()).unwrap_or_default(),
        );
        put("WeightedPreReleaseNumber", weighted.to_string());
        put("BuildMetaData", build_meta);
        put("BuildMetaDataPadded", build_meta_padded);
        put("FullBuildMetaData", full_build_meta);
        put("MajorMinorPatch", major_minor_patch.clone());
        put("SemVer", semver);
        put("LegacySemVer", legacy);
        put("LegacySemVerPadded", legacy_padded.clone());
        put("AssemblySemVer", format!("{}.0", major_minor_patch));
        put("AssemblySemFileVer", format!("{}.0", major_minor_patch));
        put("FullSemVer", full_semver);
        put("InformationalVersion", informational);
        put("BranchName", branch);
        put("EscapedBranchName", escaped_branch);
        put("Sha", sha);
        put("ShortSha", short_sha);
        put("NuGetVersionV2", legacy_padded.clone());
        put("NuGetVersion", legacy_padded);
        put("NuGetPreReleaseTagV2", padded_pre.clone());
        put("NuGetPreReleaseTag", padded_pre);
        put(
            "VersionSourceSha",
            build.version_source_sha.clone().unwrap_or_default(),
        );
        put("CommitsSinceVersionSource", commits.to_string());
        put(
            "CommitsSinceVersionSourcePadded",
            format!("{:0width$}", commits, width = PADDING),
        );
        put("UncommittedChanges", build.uncommitted_changes.to_string());
        put(
            "CommitDate",
            build
                .commit_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        );

        VersionVariables(vars)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Look up a variable, reporting unknown names as a diagnostic
    pub fn require(&self, name: &str) -> std::result::Result<&str, Diagnostic> {
        self.get(name).ok_or_else(|| Diagnostic::UnknownVariable {
            name: name.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &IndexMap<String, String> {
        &self.0
    }

    pub fn from_map(map: IndexMap<String, String>) -> Self {
        VersionVariables(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::effective::fixtures::effective;
    use crate::config::VersioningMode;
    use crate::domain::{BuildMetadata, PreReleaseTag};
    use chrono::{TimeZone, Utc};

    fn build(commits: u64) -> BuildMetadata {
        BuildMetadata {
            commits_since_version_source: commits,
            branch: Some("feature/login".to_string()),
            sha: Some("0123456789abcdef0123456789abcdef01234567".to_string()),
            short_sha: Some("0123456".to_string()),
            commit_date: Some(Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()),
            version_source_sha: Some("fedcba9876543210fedcba9876543210fedcba98".to_string()),
            uncommitted_changes: 2,
        }
    }

    fn render(version: SemanticVersion) -> VersionVariables {
        let mut config = effective(VersioningMode::ContinuousDelivery);
        config.pre_release_weight = 30000;
        VersionVariables::from_version(&version, &config)
    }

    #[test]
    fn test_pre_release_renderings() {
        let version = SemanticVersion::new(1, 2, 3)
            .with_pre_release(Some(PreReleaseTag::new("beta", Some(4))))
            .with_build(build(5));
        let vars = render(version);

        assert_eq!(vars.get("SemVer"), Some("1.2.3-beta.4"));
        assert_eq!(vars.get("FullSemVer"), Some("1.2.3-beta.4+5"));
        assert_eq!(vars.get("LegacySemVer"), Some("1.2.3-beta4"));
        assert_eq!(vars.get("LegacySemVerPadded"), Some("1.2.3-beta0004"));
        assert_eq!(vars.get("NuGetVersionV2"), Some("1.2.3-beta0004"));
        assert_eq!(vars.get("PreReleaseTagWithDash"), Some("-beta.4"));
        assert_eq!(vars.get("PreReleaseLabel"), Some("beta"));
        assert_eq!(vars.get("PreReleaseNumber"), Some("4"));
        assert_eq!(vars.get("WeightedPreReleaseNumber"), Some("30004"));
        assert_eq!(vars.get("BuildMetaDataPadded"), Some("0005"));
        assert_eq!(vars.get("CommitsSinceVersionSourcePadded"), Some("0005"));
    }

    #[test]
    fn test_release_renderings() {
        let vars = render(SemanticVersion::new(1, 0, 3).with_build(build(0)));

        assert_eq!(vars.get("FullSemVer"), Some("1.0.3"));
        assert_eq!(vars.get("PreReleaseTag"), Some(""));
        assert_eq!(vars.get("WeightedPreReleaseNumber"), Some("60000"));
        assert_eq!(vars.get("AssemblySemVer"), Some("1.0.3.0"));
        assert_eq!(
            vars.get("InformationalVersion"),
            Some("1.0.3+Branch.feature-login.Sha.0123456789abcdef0123456789abcdef01234567")
        );
    }

    #[test]
    fn test_metadata_variables() {
        let vars = render(SemanticVersion::new(0, 1, 0).with_build(build(2)));

        assert_eq!(vars.get("BranchName"), Some("feature/login"));
        assert_eq!(vars.get("EscapedBranchName"), Some("feature-login"));
        assert_eq!(vars.get("ShortSha"), Some("0123456"));
        assert_eq!(vars.get("CommitDate"), Some("2024-03-09"));
        assert_eq!(vars.get("UncommittedChanges"), Some("2"));
        assert_eq!(vars.get("CommitsSinceVersionSource"), Some("2"));
    }

    #[test]
    fn test_fixed_key_order() {
        let vars = render(SemanticVersion::new(1, 0, 0));
        let keys: Vec<&str> = vars.iter().map(|(k, _)| k).take(3).collect();
        assert_eq!(keys, vec!["Major", "Minor", "Patch"]);
        assert_eq!(vars.len(), 33);
    }

    #[test]
    fn test_unknown_variable_is_a_diagnostic() {
        let vars = render(SemanticVersion::new(1, 0, 0));
        assert_eq!(
            vars.require("Nope"),
            Err(Diagnostic::UnknownVariable {
                name: "Nope".to_string()
            })
        );
        assert_eq!(vars.require("Major"), Ok("1"));
    }
}
