use crate::config::GitVersionConfig;
use crate::error::{Result, VersionerError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the repository working directory
pub const REPOSITORY_CONFIG_FILE: &str = "GitVersion.toml";

/// File name looked up in the user configuration directory
pub const USER_CONFIG_FILE: &str = "git-versioner.toml";

/// Locate the configuration document to use
///
/// Lookup order: the explicit path, `GitVersion.toml` in `workdir` (or the
/// current directory), then `git-versioner.toml` in the user configuration
/// directory. Returns `None` when nothing exists.
pub fn find_config_file(explicit: Option<&Path>, workdir: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = workdir
        .map(|dir| dir.join(REPOSITORY_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(".").join(REPOSITORY_CONFIG_FILE));
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(USER_CONFIG_FILE))
        .filter(|path| path.exists())
}

/// Load configuration from file or return defaults
///
/// An explicit path that cannot be read is an error; a missing implicit file
/// just means built-in defaults.
///
/// # Returns
/// * `Ok(GitVersionConfig)` - Loaded or default configuration
/// * `Err` - If the file exists but cannot be read or parsed
pub fn load_config(explicit: Option<&Path>, workdir: Option<&Path>) -> Result<GitVersionConfig> {
    let Some(path) = find_config_file(explicit, workdir) else {
        debug!("no configuration file found, using defaults");
        return Ok(GitVersionConfig::default());
    };

    debug!(path = %path.display(), "loading configuration");
    let document = fs::read_to_string(&path)?;
    parse_config(&document)
}

/// Parse a configuration document
pub fn parse_config(document: &str) -> Result<GitVersionConfig> {
    toml::from_str(document)
        .map_err(|e| VersionerError::config(format!("invalid configuration document: {}", e)))
}

/// Loaded configuration with the caller's override document merged over it
pub fn with_overrides(mut base: GitVersionConfig, overrides: &GitVersionConfig) -> GitVersionConfig {
    base.merge(overrides);
    base
}
