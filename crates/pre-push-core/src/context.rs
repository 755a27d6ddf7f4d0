//! Variable Context — the keyed mapping actions interpolate against.
//!
//! Populated once per run from the push context, a version provider, a
//! platform provider, and the process environment, then frozen before any
//! action string is interpolated (`spec.md` §3 "Lifecycle", §4.2).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::PlatformInfo;
use crate::push::PushContext;

/// Errors from `${{ … }}` interpolation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    /// A `${{ key }}` reference did not resolve in the context.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// A `${{` was never closed by a matching `}}`.
    #[error("unclosed ${{{{ in: {0}")]
    Malformed(String),
}

/// Result alias for interpolation.
pub type InterpolationResult<T> = Result<T, InterpolationError>;

/// Version classification used by `only` gating (`spec.md` §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionKind {
    /// A stable release (no prerelease component).
    Release,
    /// A prerelease (e.g. `1.2.3-rc.1`).
    Prerelease,
    /// A patch-level bump relative to the previous tag.
    Patch,
    /// A minor-level bump relative to the previous tag.
    Minor,
    /// A major-level bump relative to the previous tag.
    Major,
    /// No previous tag, or the kind could not be determined.
    Unknown,
}

impl VersionKind {
    /// The string used for the `version.version-type` interpolation value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Prerelease => "prerelease",
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for VersionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A frozen key/value mapping used for `${{ … }}` interpolation and for
/// `only`/`if` gating (via [`VariableContext::version_kind`]).
#[derive(Debug, Clone, Default)]
pub struct VariableContext {
    vars: BTreeMap<String, String>,
    version_kind: VersionKind,
}

/// Builds a [`VariableContext`] from the run's three providers: push
/// context, version info, and platform info.
#[derive(Debug, Default)]
pub struct VariableContextBuilder {
    vars: BTreeMap<String, String>,
    version_kind: VersionKind,
}

impl VariableContextBuilder {
    /// Start a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the `tag`/`branch`/`tags`/`branches`/`version.tag`/
    /// `version.branch` keys from a classified push.
    #[must_use]
    pub fn with_push_context(mut self, push: &PushContext) -> Self {
        if let Some(tag) = push.tags.first() {
            self.vars.insert("tag".to_string(), tag.clone());
            self.vars.insert("version.tag".to_string(), tag.clone());
        }
        if let Some(branch) = push.branches.first() {
            self.vars.insert("branch".to_string(), branch.clone());
            self.vars
                .insert("version.branch".to_string(), branch.clone());
        }
        self.vars.insert("tags".to_string(), push.tags.join(","));
        self.vars
            .insert("branches".to_string(), push.branches.join(","));
        self
    }

    /// Populate the `version`/`project`/`module`/`modules`/`version.*` keys.
    #[must_use]
    pub fn with_version(
        mut self,
        version: &str,
        project: &str,
        module: &str,
        modules: &[String],
        build_type: &str,
        kind: VersionKind,
    ) -> Self {
        self.vars.insert("version".to_string(), version.to_string());
        self.vars.insert("project".to_string(), project.to_string());
        self.vars.insert("module".to_string(), module.to_string());
        self.vars.insert("modules".to_string(), modules.join(","));
        self.vars
            .insert("version.version".to_string(), version.to_string());
        self.vars
            .insert("version.project".to_string(), project.to_string());
        self.vars
            .insert("version.module".to_string(), module.to_string());
        self.vars
            .insert("version.modules".to_string(), modules.join(","));
        self.vars
            .insert("version.build-type".to_string(), build_type.to_string());
        self.vars.insert(
            "version.version-type".to_string(),
            kind.as_str().to_string(),
        );
        self.version_kind = kind;
        self
    }

    /// Populate the `platform`/`arch`/`os`/`os_version`/`cpu` keys.
    #[must_use]
    pub fn with_platform(mut self, platform: &PlatformInfo) -> Self {
        self.vars
            .insert("platform".to_string(), platform.platform_string());
        self.vars.insert("arch".to_string(), platform.arch.clone());
        self.vars.insert("os".to_string(), platform.os.clone());
        self.vars
            .insert("os_version".to_string(), platform.os_version.clone());
        self.vars.insert("cpu".to_string(), platform.cpu.to_string());
        self
    }

    /// Populate `env.<NAME>` for every variable in the process environment.
    #[must_use]
    pub fn with_environment(mut self) -> Self {
        for (key, value) in std::env::vars() {
            self.vars.insert(format!("env.{key}"), value);
        }
        self
    }

    /// Insert an arbitrary key/value pair (for tests or extension keys).
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Freeze the builder into a [`VariableContext`].
    #[must_use]
    pub fn build(self) -> VariableContext {
        VariableContext {
            vars: self.vars,
            version_kind: self.version_kind,
        }
    }
}

impl VariableContext {
    /// Look up a single key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// The version kind used for `only` gating.
    #[must_use]
    pub const fn version_kind(&self) -> VersionKind {
        self.version_kind
    }

    /// Replace every `${{ key }}` occurrence in `input` with its value.
    ///
    /// Single-pass, left-to-right; replacement text is never re-scanned.
    /// Fails with [`InterpolationError::UnknownVariable`] on an unresolved
    /// reference, or [`InterpolationError::Malformed`] on an unclosed
    /// `${{`.
    pub fn interpolate(&self, input: &str) -> InterpolationResult<String> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        loop {
            match rest.find("${{") {
                None => {
                    out.push_str(rest);
                    return Ok(out);
                }
                Some(start) => {
                    out.push_str(&rest[..start]);
                    let after_open = &rest[start + 3..];
                    match after_open.find("}}") {
                        None => {
                            return Err(InterpolationError::Malformed(rest[start..].to_string()));
                        }
                        Some(end) => {
                            let key = after_open[..end].trim();
                            let value = self
                                .get(key)
                                .ok_or_else(|| {
                                    InterpolationError::UnknownVariable(key.to_string())
                                })?;
                            out.push_str(value);
                            rest = &after_open[end + 2..];
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> VariableContext {
        VariableContextBuilder::new()
            .with_var("tag", "v1.2.3")
            .with_var("branch", "main")
            .build()
    }

    #[test]
    fn interpolate_single_variable() {
        assert_eq!(ctx().interpolate("${{ tag }}").unwrap(), "v1.2.3");
    }

    #[test]
    fn interpolate_no_surrounding_whitespace() {
        assert_eq!(ctx().interpolate("${{tag}}").unwrap(), "v1.2.3");
    }

    #[test]
    fn interpolate_multiple_variables() {
        assert_eq!(
            ctx().interpolate("echo ${{ tag }} on ${{ branch }}").unwrap(),
            "echo v1.2.3 on main"
        );
    }

    #[test]
    fn interpolate_no_variables() {
        assert_eq!(ctx().interpolate("echo hello").unwrap(), "echo hello");
    }

    #[test]
    fn interpolate_unknown_variable_errors() {
        let err = ctx().interpolate("${{ nope }}").unwrap_err();
        assert_eq!(err, InterpolationError::UnknownVariable("nope".to_string()));
    }

    #[test]
    fn interpolate_unclosed_errors() {
        let err = ctx().interpolate("echo ${{ tag").unwrap_err();
        assert!(matches!(err, InterpolationError::Malformed(_)));
    }

    #[test]
    fn interpolate_is_single_pass_not_recursive() {
        // Replacement text containing `${{` must not be rescanned.
        let c = VariableContextBuilder::new()
            .with_var("evil", "${{ tag }}")
            .with_var("tag", "v1.0.0")
            .build();
        assert_eq!(c.interpolate("${{ evil }}").unwrap(), "${{ tag }}");
    }

    #[test]
    fn version_kind_defaults_unknown() {
        assert_eq!(VariableContext::default().version_kind(), VersionKind::Unknown);
    }

    #[test]
    fn with_version_sets_kind_and_keys() {
        let c = VariableContextBuilder::new()
            .with_version(
                "1.2.3",
                "demo",
                "demo",
                &["demo".to_string()],
                "release",
                VersionKind::Patch,
            )
            .build();
        assert_eq!(c.version_kind(), VersionKind::Patch);
        assert_eq!(c.get("version.version-type"), Some("patch"));
        assert_eq!(c.get("version"), Some("1.2.3"));
    }
}
