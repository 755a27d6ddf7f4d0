//! Terminal reporter — colored, glyph-prefixed stage output.

use owo_colors::OwoColorize;
use pre_push_core::reporter::{Reporter, StepReport};
use pre_push_core::scheduler::{StageSummary, Status};

/// Writes colored step lines to stderr as a stage runs, then a summary.
///
/// Uses stderr (not stdout) for the same reason the teacher's
/// observability module keeps logging off stdout — a `pre-push` hook's
/// stdout is not guaranteed to go anywhere a user is watching, but stderr
/// is what git surfaces back to the terminal invoking `git push`.
#[derive(Debug, Default)]
pub struct ColorReporter {
    had_error: bool,
}

impl ColorReporter {
    /// A fresh reporter with no steps reported yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for ColorReporter {
    fn on_step(&mut self, step: &StepReport<'_>) {
        let prefix = format!("[{}/{}]", step.position, step.total);
        match step.status {
            Status::Ok => {
                eprintln!("{prefix} {} {}", "ok".green(), step.action_name);
            }
            Status::Warn => {
                eprintln!("{prefix} {} {}", "warn".yellow(), step.action_name);
                print_detail(step.output);
            }
            Status::Error => {
                self.had_error = true;
                eprintln!("{prefix} {} {}", "error".red().bold(), step.action_name);
                print_detail(step.output);
            }
            Status::Skipped => {
                eprintln!("{prefix} {} {}", "skip".dimmed(), step.action_name);
            }
            Status::Cancelled => {
                self.had_error = true;
                eprintln!("{prefix} {} {}", "cancelled".red(), step.action_name);
            }
        }
    }

    fn finish(&mut self, summary: &StageSummary) {
        let (ok, warn, error, skipped, cancelled) = summary.status_counts();

        if error > 0 || cancelled > 0 {
            eprintln!("{} {} step(s) failed", "pre-push:".red().bold(), error + cancelled);
        } else if warn > 0 {
            eprintln!("{} {warn} warning(s)", "pre-push:".yellow().bold());
        } else {
            eprintln!(
                "{} {} step(s) passed",
                "pre-push:".green().bold(),
                summary.results.len()
            );
        }
        eprintln!(
            "{} {ok} ok, {warn} warn, {error} error, {skipped} skipped, {cancelled} cancelled",
            "pre-push:".dimmed()
        );
    }
}

fn print_detail(output: &str) {
    for line in output.lines() {
        eprintln!("      {line}");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pre_push_core::reporter::report;
    use pre_push_core::scheduler::StepResult;

    use super::*;

    fn result(status: Status) -> StepResult {
        StepResult {
            declaration_index: 0,
            action_name: "demo".to_string(),
            status,
            output: String::new(),
            duration: Duration::ZERO,
            skip_reason: None,
        }
    }

    #[test]
    fn reporter_tracks_errors_without_panicking() {
        let summary = StageSummary {
            results: vec![result(Status::Ok), result(Status::Error)],
        };
        let mut reporter = ColorReporter::new();
        report(&mut reporter, &summary);
        assert!(reporter.had_error);
    }

    #[test]
    fn reporter_handles_empty_stage() {
        let summary = StageSummary::default();
        let mut reporter = ColorReporter::new();
        report(&mut reporter, &summary);
        assert!(!reporter.had_error);
    }

    #[test]
    fn reporter_tracks_cancellation_as_error() {
        let summary = StageSummary {
            results: vec![result(Status::Ok), result(Status::Cancelled)],
        };
        let mut reporter = ColorReporter::new();
        report(&mut reporter, &summary);
        assert!(reporter.had_error);
    }
}
