//! Hook Installer — copies this binary itself into `.git/hooks/pre-push`
//! and keeps it content-hash-idempotent across reinstalls.
//!
//! Git invokes hook scripts directly, so the installed file is a
//! byte-exact copy of the running executable — not a shell wrapper
//! around it — with a file mode that permits execution by the owner.

use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use camino::{Utf8Path, Utf8PathBuf};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, instrument};

/// Errors from installing or inspecting the hook.
#[derive(Error, Debug)]
pub enum HookInstallError {
    /// Failed to read or write the hook file or its parent directory.
    #[error("hook filesystem error: {0}")]
    Io(#[from] std::io::Error),

    /// `.git/hooks` doesn't exist — not a git repository, or a bare
    /// checkout without the standard layout.
    #[error(".git/hooks directory not found at {0}")]
    HooksDirMissing(Utf8PathBuf),
}

/// Result alias for hook installation.
pub type HookInstallResult<T> = Result<T, HookInstallError>;

/// What [`install`] actually did, for CLI reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// No hook existed; one was written.
    Installed,
    /// A hook existed with identical content; nothing changed.
    AlreadyUpToDate,
    /// A hook existed with different content (a prior install of a
    /// different binary, or some other script); it was replaced.
    Updated,
}

/// SHA-256 of `input`, hex-encoded — used to compare the installed hook's
/// content against the running binary's without relying on mtimes.
#[must_use]
pub fn content_hash(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// Install a copy of `binary_path` at `git_dir`/hooks/pre-push.
///
/// Idempotent: reinstalling the same binary leaves an up-to-date hook
/// untouched, identified by comparing a SHA-256 of the file contents
/// rather than the file's path or mtime.
#[instrument(skip(git_dir))]
pub fn install(git_dir: &Utf8Path, binary_path: &Utf8Path) -> HookInstallResult<InstallOutcome> {
    let hooks_dir = git_dir.join("hooks");
    if !hooks_dir.is_dir() {
        return Err(HookInstallError::HooksDirMissing(hooks_dir));
    }

    let hook_path = hooks_dir.join("pre-push");
    let binary_bytes = fs::read(binary_path)?;

    if hook_path.exists() {
        let existing = fs::read(&hook_path)?;
        if content_hash(&existing) == content_hash(&binary_bytes) {
            return Ok(InstallOutcome::AlreadyUpToDate);
        }
        write_executable(&hook_path, &binary_bytes)?;
        info!(path = %hook_path, "updated pre-push hook");
        return Ok(InstallOutcome::Updated);
    }

    write_executable(&hook_path, &binary_bytes)?;
    info!(path = %hook_path, "installed pre-push hook");
    Ok(InstallOutcome::Installed)
}

fn write_executable(path: &Utf8Path, content: &[u8]) -> HookInstallResult<()> {
    fs::write(path, content)?;
    #[cfg(unix)]
    {
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}
