//! Library interface for the `pre-push` CLI.
//!
//! Exposes the CLI's argument parser and command structure as a library,
//! primarily for integration testing. The actual entry point is in
//! `main.rs`, which also handles hook-invocation mode (no subcommand,
//! stdin piped, re-invoked by git as `.git/hooks/pre-push`).
//!
//! # Structure
//!
//! - [`Cli`] - The root argument parser (clap derive)
//! - [`Commands`] - Available subcommands
//! - [`commands`] - Command implementations

pub mod commands;
pub mod reporter_cli;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Color output preference.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect terminal capabilities automatically.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}

impl ColorChoice {
    /// Configure global color output based on this choice.
    pub fn apply(self) {
        match self {
            Self::Auto => {}
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }
}

const ENV_HELP: &str = "\
ENVIRONMENT VARIABLES:
    RUST_LOG                Log filter (e.g., debug, pre_push=trace)
    PRE_PUSH_LOG_PATH        Explicit log file path
    PRE_PUSH_LOG_DIR         Log directory
";

/// Command-line interface definition for `pre-push`.
#[derive(Parser)]
#[command(name = "pre-push")]
#[command(about = "Configurable, dependency-ordered Git pre-push hook runner", long_about = None)]
#[command(version)]
#[command(after_long_help = ENV_HELP)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to ambient tool configuration (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run as if started in DIR
    #[arg(short = 'C', long, global = true)]
    pub chdir: Option<PathBuf>,

    /// Only print errors (suppresses warnings/info)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// More detail (repeatable; e.g. -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Also mirror diagnostic logs to stderr (same as `PRE_PUSH_DEBUG=1`)
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    /// Colorize output
    #[arg(long, global = true, value_enum, default_value_t)]
    pub color: ColorChoice,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available subcommands for the CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Install the pre-push hook into the current repository
    Install(commands::install::InstallArgs),

    /// Run a stage against a simulated push, without installing anything
    Test(commands::test::TestArgs),

    /// List every registered built-in identifier and a one-line description
    ListUses(commands::list_uses::ListUsesArgs),
}
