//! `install` command — copy this binary into `.git/hooks/pre-push`.

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Args;
use owo_colors::OwoColorize;
use pre_push_core::hook_install::{self, InstallOutcome};
use tracing::instrument;

use super::{current_dir_utf8, git_dir};

/// Arguments for the `install` subcommand.
#[derive(Args, Debug, Default)]
pub struct InstallArgs {}

/// Run the `install` subcommand.
#[instrument(skip(_args))]
pub fn cmd_install(_args: InstallArgs, json: bool) -> anyhow::Result<()> {
    let cwd = current_dir_utf8()?;
    let dot_git = git_dir(&cwd);

    let binary_path = std::env::current_exe().context("failed to determine this binary's path")?;
    let binary_path = Utf8PathBuf::from_path_buf(binary_path)
        .map_err(|p| anyhow::anyhow!("binary path is not valid UTF-8: {}", p.display()))?;

    let outcome = hook_install::install(&dot_git, &binary_path)
        .context("failed to install pre-push hook")?;

    let version = env!("CARGO_PKG_VERSION");

    if json {
        println!(
            "{}",
            serde_json::json!({ "outcome": outcome_str(outcome), "version": version })
        );
        return Ok(());
    }

    match outcome {
        InstallOutcome::Installed => {
            println!("{} hook installed (v{version})", "pre-push:".green().bold());
        }
        InstallOutcome::AlreadyUpToDate => {
            println!("{} hook already up to date (v{version})", "pre-push:".dimmed());
        }
        InstallOutcome::Updated => {
            println!("{} hook updated to v{version}", "pre-push:".green().bold());
        }
    }

    Ok(())
}

fn outcome_str(outcome: InstallOutcome) -> &'static str {
    match outcome {
        InstallOutcome::Installed => "installed",
        InstallOutcome::AlreadyUpToDate => "already-up-to-date",
        InstallOutcome::Updated => "updated",
    }
}
