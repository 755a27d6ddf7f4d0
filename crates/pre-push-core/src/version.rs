//! Version parsing and kind classification.
//!
//! The Variable Context's `version.version-type` key (used for `only`
//! gating) is derived here from the two most recent semver tags, the way
//! the teacher's `version` module derives a next version from a current
//! one — except we classify a *transition* rather than compute one.

use semver::Version;
use thiserror::Error;

use crate::context::VersionKind;
use crate::git::{self, GitError};

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// Failed to parse a semver string.
    #[error("invalid semver: {0}")]
    InvalidSemver(#[from] semver::Error),

    /// A git operation failed while resolving version tags.
    #[error("git error: {0}")]
    Git(#[from] GitError),
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Parse a version string, stripping an optional `v` prefix.
pub fn parse_version(s: &str) -> VersionResult<Version> {
    let s = s.strip_prefix('v').unwrap_or(s);
    Ok(Version::parse(s)?)
}

/// Classify the transition from `previous` to `current` into a
/// [`VersionKind`].
///
/// - `current` has a prerelease component → [`VersionKind::Prerelease`]
/// - no `previous` → [`VersionKind::Unknown`] (first release)
/// - otherwise, the highest-order component that changed between
///   `previous` and `current` → major/minor/patch; if none changed and
///   `current` has no prerelease component, → [`VersionKind::Release`]
#[must_use]
pub fn classify_kind(previous: Option<&Version>, current: &Version) -> VersionKind {
    if !current.pre.is_empty() {
        return VersionKind::Prerelease;
    }

    let Some(previous) = previous else {
        return VersionKind::Unknown;
    };

    if current.major != previous.major {
        VersionKind::Major
    } else if current.minor != previous.minor {
        VersionKind::Minor
    } else if current.patch != previous.patch {
        VersionKind::Patch
    } else {
        VersionKind::Release
    }
}

/// Resolve the current and previous version tags from the repository, and
/// the [`VersionKind`] of the transition between them.
pub fn resolve_current_version() -> VersionResult<(Option<Version>, Option<Version>, VersionKind)> {
    let tags = git::version_tags_sorted()?;
    let current = tags.first().map(|t| parse_version(t)).transpose()?;
    let previous = tags.get(1).map(|t| parse_version(t)).transpose()?;

    let kind = current
        .as_ref()
        .map_or(VersionKind::Unknown, |c| classify_kind(previous.as_ref(), c));

    Ok((current, previous, kind))
}
