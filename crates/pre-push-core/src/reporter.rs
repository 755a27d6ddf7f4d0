//! Reporter contract — how a stage run is surfaced to a human or to JSON.
//!
//! The scheduler itself never prints anything; it returns a
//! [`crate::scheduler::StageSummary`], and a [`Reporter`] implementation
//! decides how to present it. This mirrors the teacher's split between
//! command logic and terminal rendering.

use crate::scheduler::{StageSummary, Status};

/// Receives step-level and stage-level events as a run progresses.
///
/// Implementations may print as events arrive (for a live terminal view)
/// or buffer until [`Reporter::finish`] (for a single JSON document) —
/// the scheduler calls `on_step` once per result, strictly in declaration
/// order, before calling `finish` once.
pub trait Reporter {
    /// Called once per step result, in declaration order.
    fn on_step(&mut self, step: &StepReport<'_>);

    /// Called once after every step in the stage has reported.
    fn finish(&mut self, summary: &StageSummary);
}

/// A single step's result, bundled with its position for reporters that
/// want ordinal output (`"[2/5] ..."`).
#[derive(Debug, Clone, Copy)]
pub struct StepReport<'a> {
    /// 1-based position of this step among all steps in the stage.
    pub position: usize,
    /// Total steps in the stage.
    pub total: usize,
    /// The action name.
    pub action_name: &'a str,
    /// The step's outcome.
    pub status: Status,
    /// Captured output.
    pub output: &'a str,
}

/// A minimal reporter that writes plain, uncolored lines — used for piped
/// output and as the base the CLI's colored reporter wraps.
#[derive(Debug, Default)]
pub struct PlainReporter {
    lines: Vec<String>,
}

impl PlainReporter {
    /// A fresh reporter with no buffered lines.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lines recorded so far, in report order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Reporter for PlainReporter {
    fn on_step(&mut self, step: &StepReport<'_>) {
        let glyph = match step.status {
            Status::Ok => "ok",
            Status::Warn => "warn",
            Status::Error => "error",
            Status::Skipped => "skip",
            Status::Cancelled => "cancelled",
        };
        self.lines.push(format!(
            "[{}/{}] {} {}",
            step.position, step.total, glyph, step.action_name
        ));
    }

    fn finish(&mut self, summary: &StageSummary) {
        let (ok, warn, error, skipped, cancelled) = summary.status_counts();
        let mut line = format!(
            "{} steps: {ok} ok, {warn} warn, {error} error(s), {skipped} skipped",
            summary.results.len()
        );
        if cancelled > 0 {
            line.push_str(&format!(", {cancelled} cancelled"));
        }
        self.lines.push(line);
    }
}

/// Drive a [`Reporter`] over a completed [`StageSummary`], calling
/// `on_step` in declaration order and `finish` once at the end.
pub fn report(reporter: &mut dyn Reporter, summary: &StageSummary) {
    let total = summary.results.len();
    for (position, result) in summary.results.iter().enumerate() {
        reporter.on_step(&StepReport {
            position: position + 1,
            total,
            action_name: &result.action_name,
            status: result.status,
            output: &result.output,
        });
    }
    reporter.finish(summary);
}
