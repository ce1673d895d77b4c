use thiserror::Error;

/// Unified error type for version calculation
#[derive(Error, Debug)]
pub enum VersionerError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Monotonicity violation: computed version {computed} is lower than reachable tag {tag}")]
    Monotonicity { computed: String, tag: String },

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("Branch error: {0}")]
    Branch(String),

    #[error("Repository access failed: {0}")]
    Repository(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-versioner
pub type Result<T> = std::result::Result<T, VersionerError>;

impl VersionerError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        VersionerError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        VersionerError::Version(msg.into())
    }

    /// Create a branch error with context
    pub fn branch(msg: impl Into<String>) -> Self {
        VersionerError::Branch(msg.into())
    }

    /// Create a repository access error with context
    pub fn repository(msg: impl Into<String>) -> Self {
        VersionerError::Repository(msg.into())
    }

    /// Errors that abort the computation instead of degrading to a diagnostic.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VersionerError::Config(_)
                | VersionerError::Monotonicity { .. }
                | VersionerError::Repository(_)
        )
    }
}

impl From<regex::Error> for VersionerError {
    fn from(err: regex::Error) -> Self {
        VersionerError::Config(format!("invalid regular expression: {}", err))
    }
}

impl From<toml::de::Error> for VersionerError {
    fn from(err: toml::de::Error) -> Self {
        VersionerError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for VersionerError {
    fn from(err: toml::ser::Error) -> Self {
        VersionerError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for VersionerError {
    fn from(err: serde_json::Error) -> Self {
        VersionerError::Serialization(err.to_string())
    }
}
