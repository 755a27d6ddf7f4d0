//! Action Runner — executes a resolved [`ActionKind`] and reports its
//! outcome as a single exit code plus captured output.
//!
//! Shell scripts run under `sh -c` after interpolation; `uses:` identifiers
//! dispatch to a small built-in registry backed by [`crate::git`]. A shell
//! child is polled with `try_wait` rather than blocked on with `wait`/
//! `output`, so a [`CancellationToken`] set mid-run can kill it instead of
//! only gating work that hasn't started yet.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::context::VariableContext;
use crate::git::{self, GitError};
use crate::manifest::ActionKind;

/// How often `run_shell` polls a running child for exit and for
/// cancellation while it's in flight.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Shared flag a caller can set to abort a run early (e.g. on SIGINT).
/// The scheduler checks it before dispatching a node; a node already
/// in flight sees it too, via the `try_wait` poll loop in [`run_shell`],
/// which kills the child once the flag flips.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A fresh, unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// `true` once [`CancellationToken::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Errors from running an action.
#[derive(Error, Debug)]
pub enum RunError {
    /// `${{ … }}` interpolation failed before the action could run.
    #[error("interpolation error: {0}")]
    Interpolation(#[from] crate::context::InterpolationError),

    /// Failed to spawn or wait on the shell subprocess.
    #[error("failed to execute action: {0}")]
    Spawn(#[from] std::io::Error),

    /// A built-in (`uses:`) action isn't recognized.
    #[error("unknown built-in action: {0}")]
    UnknownBuiltin(String),

    /// A built-in action's underlying git call failed.
    #[error("built-in action failed: {0}")]
    Builtin(#[from] GitError),

    /// The action's `CancellationToken` was set while the subprocess was
    /// still running, and it was killed before it could finish.
    #[error("cancelled")]
    Cancelled,
}

/// Result alias for running an action.
pub type RunResult<T> = Result<T, RunError>;

/// The outcome of running one action: whether it succeeded, and what it
/// printed, for display and logging.
#[derive(Debug, Clone)]
pub struct ActionOutput {
    /// `true` if the action's exit code was 0 (or the built-in found
    /// nothing to flag).
    pub success: bool,
    /// Combined stdout/stderr, for reporter detail and structured logs.
    pub output: String,
}

/// Run a resolved action body against `context`, blocking the calling
/// thread until it completes.
///
/// `Uses` built-ins that represent a check (e.g. `git@untracked`) fail
/// (`success: false`) when the condition they check for is present —
/// "untracked files exist" is a failure the hook should report, not an
/// error while running the check itself.
pub fn run(
    kind: ActionKind<'_>,
    context: &VariableContext,
    cancel: &CancellationToken,
) -> RunResult<ActionOutput> {
    match kind {
        ActionKind::Run(script) => run_shell(script, context, cancel),
        ActionKind::Uses(builtin) => run_builtin(builtin),
    }
}

/// An owned copy of an [`ActionKind`]'s body, so it can be moved onto a
/// worker thread without borrowing from the manifest.
#[derive(Debug, Clone)]
pub enum ActionBody {
    /// Owned shell script.
    Run(String),
    /// Owned built-in identifier.
    Uses(String),
}

impl From<ActionKind<'_>> for ActionBody {
    fn from(kind: ActionKind<'_>) -> Self {
        match kind {
            ActionKind::Run(script) => Self::Run(script.to_string()),
            ActionKind::Uses(builtin) => Self::Uses(builtin.to_string()),
        }
    }
}

/// Run an owned action body — the worker-thread counterpart of [`run`].
pub fn run_owned(
    body: &ActionBody,
    context: &VariableContext,
    cancel: &CancellationToken,
) -> RunResult<ActionOutput> {
    match body {
        ActionBody::Run(script) => run_shell(script, context, cancel),
        ActionBody::Uses(builtin) => run_builtin(builtin),
    }
}

/// Spawn `sh -c <script>` and poll it to completion instead of blocking on
/// `wait`/`output`, so a `cancel` set while the child is running can kill
/// it rather than only suppress work that hasn't started yet.
///
/// stdout/stderr are drained on their own threads while the poll loop runs,
/// so a child that fills its pipe buffer can't deadlock against a parent
/// that's busy polling instead of reading.
fn run_shell(
    script: &str,
    context: &VariableContext,
    cancel: &CancellationToken,
) -> RunResult<ActionOutput> {
    let interpolated = context.interpolate(script)?;

    let mut child: Child = Command::new("sh")
        .arg("-c")
        .arg(&interpolated)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut stdout = child.stdout.take().expect("piped stdout");
    let mut stderr = child.stderr.take().expect("piped stderr");
    let stdout_handle = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf);
        buf
    });
    let stderr_handle = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf);
        buf
    });

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            // Drain the pipes so the reader threads don't block forever on
            // a dropped-but-unread stdout/stderr handle.
            let _ = stdout_handle.join();
            let _ = stderr_handle.join();
            return Err(RunError::Cancelled);
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout_bytes = stdout_handle.join().unwrap_or_default();
    let stderr_bytes = stderr_handle.join().unwrap_or_default();
    let mut combined = String::from_utf8_lossy(&stdout_bytes).to_string();
    combined.push_str(&String::from_utf8_lossy(&stderr_bytes));

    Ok(ActionOutput {
        success: status.success(),
        output: combined,
    })
}

/// Every `uses:` identifier this runner recognizes, paired with a
/// one-line description — the registry `list-uses` reports from.
pub const BUILTIN_REGISTRY: &[(&str, &str)] = &[
    ("git@untracked", "fails if the working tree has untracked files"),
    ("git@uncommitted", "fails if the working tree has any uncommitted changes"),
    ("git@modified", "fails if any tracked file has unstaged modifications"),
];

fn run_builtin(name: &str) -> RunResult<ActionOutput> {
    match name {
        "git@untracked" => {
            let status = git::status_porcelain()?;
            let untracked: Vec<&str> = status
                .lines()
                .filter(|l| l.starts_with("??"))
                .collect();
            Ok(ActionOutput {
                success: untracked.is_empty(),
                output: untracked.join("\n"),
            })
        }
        "git@uncommitted" => {
            let status = git::status_porcelain()?;
            let dirty: Vec<&str> = status.lines().collect();
            Ok(ActionOutput {
                success: dirty.is_empty(),
                output: dirty.join("\n"),
            })
        }
        "git@modified" => {
            let modified = git::modified_files()?;
            Ok(ActionOutput {
                success: modified.is_empty(),
                output: modified.join("\n"),
            })
        }
        other => Err(RunError::UnknownBuiltin(other.to_string())),
    }
}
