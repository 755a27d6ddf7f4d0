//! Git operations used by the push classifier, version resolver, and
//! built-in actions.
//!
//! Shells out to `git` for all operations, inheriting the user's SSH keys,
//! GPG signing, hooks, and other configuration — the same rationale the
//! teacher's `git` module documents.

use std::process::Command;

use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "status").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Check whether we're inside a git repository.
#[instrument]
pub fn is_inside_repo() -> GitResult<bool> {
    let result = git(&["rev-parse", "--is-inside-work-tree"]);
    match result {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::Command { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

/// The raw `git status --porcelain` output, used by the `git@*` built-ins.
#[instrument]
pub fn status_porcelain() -> GitResult<String> {
    git(&["status", "--porcelain"])
}

/// Names of tracked-but-modified files (`git diff --name-only`).
#[instrument]
pub fn modified_files() -> GitResult<Vec<String>> {
    let output = git(&["diff", "--name-only"])?;
    Ok(output.lines().map(str::to_string).collect())
}

/// Get the current branch name. Returns `None` in a detached HEAD state.
#[instrument]
pub fn current_branch() -> GitResult<Option<String>> {
    let output = git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
    let branch = output.trim().to_string();
    if branch == "HEAD" {
        debug!("detached HEAD");
        Ok(None)
    } else {
        Ok(Some(branch))
    }
}

/// Get the current tag (`git describe --tags --abbrev=0`), if any.
#[instrument]
pub fn current_tag() -> GitResult<Option<String>> {
    match git(&["describe", "--tags", "--abbrev=0"]) {
        Ok(output) => Ok(Some(output.trim().to_string())),
        Err(GitError::Command { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// All `v*`-prefixed tags, newest first by semver ordering.
#[instrument]
pub fn version_tags_sorted() -> GitResult<Vec<String>> {
    match git(&["tag", "--list", "v*", "--sort=-version:refname"]) {
        Ok(output) => Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()),
        Err(GitError::Command { .. }) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Get the remote URL for a named remote. Returns `None` if unconfigured.
#[instrument]
pub fn remote_url(remote: &str) -> GitResult<Option<String>> {
    match git(&["remote", "get-url", remote]) {
        Ok(url) => Ok(Some(url.trim().to_string())),
        Err(GitError::Command { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Run a git command and return its stdout.
fn git(args: &[&str]) -> GitResult<String> {
    let output = Command::new("git").args(args).output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }

        Err(GitError::Command {
            command: args.first().unwrap_or(&"").to_string(),
            stderr,
        })
    }
}
