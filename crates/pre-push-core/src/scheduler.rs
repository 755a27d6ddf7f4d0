//! Scheduler — runs a stage's dependency graph to completion.
//!
//! A fixed-size [`threadpool::ThreadPool`] executes ready nodes concurrently;
//! completed results are returned over an `mpsc` channel to a single-threaded
//! collector loop, which is the sole owner of all run state (`completed`,
//! `failed`, `displayed`). Ownership transfers through the channel instead
//! of through a shared `Mutex`, so the collector never contends with the
//! workers for a lock — it just blocks on `recv()` between messages.
//!
//! Completion can race ahead of declaration order (a later node may finish
//! before an earlier one), but the collector only *reports* a node once
//! every node before it in declaration order has also finished — `spec.md`
//! §4.4's "in-order reporting despite out-of-order completion".

use std::collections::HashSet;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use threadpool::ThreadPool;
use tracing::{debug, instrument};

use crate::context::VariableContext;
use crate::graph::Graph;
use crate::manifest::OnError;
use crate::runner::{self, ActionBody, RunError};

// The cancellation flag itself lives in `runner`, next to the `try_wait`
// poll loop that actually kills an in-flight child on it; re-exported here
// since this is where callers (the scheduler's public API) expect it.
pub use crate::runner::CancellationToken;

/// The outcome of running a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The action ran and exited successfully.
    Ok,
    /// The action ran, exited non-zero, and `on_error: warn` demoted it.
    Warn,
    /// The action ran, exited non-zero, under the default `on_error: stop`.
    Error,
    /// The step's `if`/`only` gate was unmet, or a required dependency
    /// failed — the step never ran.
    Skipped,
    /// The step was in flight when a [`CancellationToken`] was set, and
    /// its subprocess was killed before it finished.
    Cancelled,
}

impl Status {
    /// `true` for [`Status::Error`] — the only status that represents a
    /// genuine run failure under the `stop` policy.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

/// The result of one node's execution (or non-execution), keyed to its
/// position in the graph via `declaration_index`.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Index into the originating [`Graph::nodes`] / declaration order.
    pub declaration_index: usize,
    /// The action name this result belongs to.
    pub action_name: String,
    /// Final status.
    pub status: Status,
    /// Captured output, empty for skipped steps.
    pub output: String,
    /// Wall-clock duration of the run, zero for skipped steps.
    pub duration: Duration,
    /// Why a step was skipped, if it was.
    pub skip_reason: Option<SkipReason>,
}

/// Why a step ended up [`Status::Skipped`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The step's `if` predicate evaluated false.
    IfGate,
    /// The step's `only` set excluded the current version kind.
    OnlyGate,
    /// A required dependency failed (error, or itself dependency-skipped).
    FailedDependency,
    /// A [`CancellationToken`] was already set when this step became
    /// eligible to run, so it was never dispatched.
    Cancelled,
}

/// Aggregate outcome of running an entire stage.
#[derive(Debug, Clone, Default)]
pub struct StageSummary {
    /// Per-step results, in declaration order.
    pub results: Vec<StepResult>,
}

impl StageSummary {
    /// `true` if any step ended in [`Status::Error`], or the run was
    /// cancelled — cancellation ends the run with ERROR status regardless
    /// of what any individual step reported.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.results.iter().any(|r| r.status.is_error()) || self.was_cancelled()
    }

    /// `true` if any step was killed mid-run or never dispatched because
    /// the run was cancelled.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.results.iter().any(|r| {
            matches!(r.status, Status::Cancelled) || matches!(r.skip_reason, Some(SkipReason::Cancelled))
        })
    }

    /// Count of results in each [`Status`], in the order
    /// `(ok, warn, error, skipped, cancelled)` — used by reporters for a
    /// final summary line.
    #[must_use]
    pub fn status_counts(&self) -> (usize, usize, usize, usize, usize) {
        let mut counts = (0, 0, 0, 0, 0);
        for r in &self.results {
            match r.status {
                Status::Ok => counts.0 += 1,
                Status::Warn => counts.1 += 1,
                Status::Error => counts.2 += 1,
                Status::Skipped => counts.3 += 1,
                Status::Cancelled => counts.4 += 1,
            }
        }
        counts
    }
}

/// Evaluate a step's `if` predicate: a bare variable reference that must
/// interpolate to a non-empty, non-`"false"` string to pass.
fn if_gate_passes(predicate: &str, context: &VariableContext) -> bool {
    match context.interpolate(predicate) {
        Ok(value) => {
            let value = value.trim();
            !value.is_empty() && value != "false" && value != "0"
        }
        Err(_) => false,
    }
}

/// Run every node in `graph` to completion, honoring `require` edges, gate
/// predicates, and `on_error` policy, using up to `parallelism` worker
/// threads.
#[instrument(skip(graph, context, cancel))]
pub fn run_stage(
    graph: &Graph<'_>,
    context: &VariableContext,
    parallelism: usize,
    cancel: &CancellationToken,
) -> StageSummary {
    let node_count = graph.nodes.len();
    if node_count == 0 {
        return StageSummary::default();
    }

    let pool = ThreadPool::new(parallelism.max(1));
    let (tx, rx) = mpsc::channel::<StepResult>();

    let mut completed: Vec<Option<StepResult>> = vec![None; node_count];
    let mut failed: HashSet<usize> = HashSet::new();
    let mut dispatched: HashSet<usize> = HashSet::new();
    let mut remaining = node_count;

    let mut results = Vec::with_capacity(node_count);
    let mut displayed = 0usize;

    // Seed every node whose requirements are already empty.
    dispatch_ready(graph, context, &pool, &tx, &mut dispatched, &completed, &failed, cancel);

    while remaining > 0 {
        let result = match rx.recv() {
            Ok(result) => result,
            Err(_) => break,
        };

        remaining -= 1;
        let index = result.declaration_index;
        if result.status.is_error() || matches!(result.status, Status::Cancelled) {
            failed.insert(index);
        } else if matches!(result.status, Status::Skipped)
            && matches!(
                result.skip_reason,
                Some(SkipReason::FailedDependency) | Some(SkipReason::Cancelled)
            )
        {
            failed.insert(index);
        }
        completed[index] = Some(result);

        dispatch_ready(graph, context, &pool, &tx, &mut dispatched, &completed, &failed, cancel);

        // Flush every run of consecutive declaration indices now resolved,
        // so the reporter only ever sees steps in declaration order.
        while displayed < node_count {
            let Some(ref resolved) = completed[displayed] else {
                break;
            };
            results.push(resolved.clone());
            displayed += 1;
        }
    }

    debug!(displayed, node_count, "stage scheduling complete");
    StageSummary { results }
}

/// Dispatch every node whose dependencies have all resolved and who hasn't
/// already been dispatched, skipping those that are gated out or whose
/// dependencies failed.
#[allow(clippy::too_many_arguments)]
fn dispatch_ready(
    graph: &Graph<'_>,
    context: &VariableContext,
    pool: &ThreadPool,
    tx: &mpsc::Sender<StepResult>,
    dispatched: &mut HashSet<usize>,
    completed: &[Option<StepResult>],
    failed: &HashSet<usize>,
    cancel: &CancellationToken,
) {
    for (index, node) in graph.nodes.iter().enumerate() {
        if dispatched.contains(&index) {
            continue;
        }
        let all_deps_resolved = node.requires.iter().all(|dep| completed[*dep].is_some());
        if !all_deps_resolved {
            continue;
        }
        dispatched.insert(index);

        let dep_failed = node.requires.iter().any(|dep| failed.contains(dep));
        let action_name = node.action.name.clone();

        if dep_failed {
            let _ = tx.send(StepResult {
                declaration_index: index,
                action_name,
                status: Status::Skipped,
                output: String::new(),
                duration: Duration::ZERO,
                skip_reason: Some(SkipReason::FailedDependency),
            });
            continue;
        }

        if cancel.is_cancelled() {
            let _ = tx.send(StepResult {
                declaration_index: index,
                action_name,
                status: Status::Skipped,
                output: String::new(),
                duration: Duration::ZERO,
                skip_reason: Some(SkipReason::Cancelled),
            });
            continue;
        }

        if let Some(gate) = gate_check(node.step, context) {
            let _ = tx.send(StepResult {
                declaration_index: index,
                action_name,
                status: Status::Skipped,
                output: String::new(),
                duration: Duration::ZERO,
                skip_reason: Some(gate),
            });
            continue;
        }

        let body: ActionBody = node.action.kind().expect("validated manifest").into();
        let on_error = node.step.on_error;
        let context = context.clone();
        let tx = tx.clone();
        let cancel = cancel.clone();

        pool.execute(move || {
            let start = Instant::now();
            let outcome = runner::run_owned(&body, &context, &cancel);
            let duration = start.elapsed();

            let result = match outcome {
                Ok(output) if output.success => StepResult {
                    declaration_index: index,
                    action_name,
                    status: Status::Ok,
                    output: output.output,
                    duration,
                    skip_reason: None,
                },
                Ok(output) => StepResult {
                    declaration_index: index,
                    action_name,
                    status: demote_on_error(on_error),
                    output: output.output,
                    duration,
                    skip_reason: None,
                },
                Err(RunError::Cancelled) => StepResult {
                    declaration_index: index,
                    action_name,
                    status: Status::Cancelled,
                    output: "cancelled: subprocess killed".to_string(),
                    duration,
                    skip_reason: None,
                },
                Err(err) => StepResult {
                    declaration_index: index,
                    action_name,
                    status: demote_on_error(on_error),
                    output: describe_run_error(&err),
                    duration,
                    skip_reason: None,
                },
            };

            let _ = tx.send(result);
        });
    }
}

fn demote_on_error(policy: OnError) -> Status {
    match policy {
        OnError::Stop => Status::Error,
        OnError::Warn => Status::Warn,
    }
}

fn describe_run_error(err: &RunError) -> String {
    err.to_string()
}

/// Check a step's `if`/`only` gates against `context`. Returns `Some` with
/// the reason if the step should be skipped, `None` if it may run.
fn gate_check(step: &crate::manifest::Step, context: &VariableContext) -> Option<SkipReason> {
    if let Some(predicate) = &step.r#if {
        if !if_gate_passes(predicate, context) {
            return Some(SkipReason::IfGate);
        }
    }
    if let Some(only) = &step.only {
        if !only.contains(&context.version_kind()) {
            return Some(SkipReason::OnlyGate);
        }
    }
    None
}
