//! Command implementations.

pub mod install;
pub mod list_uses;

use camino::Utf8Path;
use pre_push_core::context::{VariableContext, VariableContextBuilder};
use pre_push_core::manifest::Manifest;
use pre_push_core::platform::PlatformInfo;
use pre_push_core::push::PushContext;
use pre_push_core::version;

/// Build the Variable Context a stage runs against, from the manifest's
/// project metadata, the simulated or real push context, and this
/// process's platform facts. Returns the resolved project version
/// alongside the context, for the reporter's "checking" line.
///
/// Shared by `test` (simulated push) and the real hook entry point in
/// `main.rs` (actual push).
pub fn build_context(
    manifest: &Manifest,
    push: &PushContext,
) -> anyhow::Result<(VariableContext, String)> {
    let (current, _previous, kind) = version::resolve_current_version()
        .unwrap_or((None, None, pre_push_core::context::VersionKind::Unknown));
    let version_str = current.as_ref().map_or_else(|| "0.0.0".to_string(), ToString::to_string);

    let modules = manifest.project.modules.clone();
    let module = modules.first().cloned().unwrap_or_default();
    let platform = PlatformInfo::collect();

    let context = VariableContextBuilder::new()
        .with_push_context(push)
        .with_version(&version_str, &manifest.project.name, &module, &modules, "release", kind)
        .with_platform(&platform)
        .with_environment()
        .build();

    Ok((context, version_str))
}

/// Resolve the current working directory as a UTF-8 path, for manifest and
/// hook discovery.
pub fn current_dir_utf8() -> anyhow::Result<camino::Utf8PathBuf> {
    let cwd = std::env::current_dir()?;
    camino::Utf8PathBuf::from_path_buf(cwd)
        .map_err(|p| anyhow::anyhow!("current directory is not valid UTF-8: {}", p.display()))
}

/// Resolve `.git` beneath `start`, the way git itself would for a
/// non-worktree checkout.
pub fn git_dir(start: &Utf8Path) -> camino::Utf8PathBuf {
    start.join(".git")
}
