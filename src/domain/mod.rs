//! Domain logic - pure versioning rules independent of git operations

pub mod branch;
pub mod commit;
pub mod prerelease;
pub mod tag;
pub mod version;

pub use branch::{escape_identifier, BranchName};
pub use commit::ConventionalCommit;
pub use prerelease::PreReleaseTag;
pub use tag::{TagPrefix, VersionTag};
pub use version::{BuildMetadata, SemanticVersion, VersionField};
