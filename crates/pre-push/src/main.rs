//! `pre-push` binary.
//!
//! This binary serves two roles:
//!
//! 1. **CLI** — `pre-push install`, `pre-push test`, `pre-push list-uses`,
//!    invoked directly by a developer.
//! 2. **Hook** — `.git/hooks/pre-push <remote-name> <remote-url>`, invoked
//!    by git itself with ref updates fed on stdin. `install` places a
//!    byte-exact copy of this same binary there (`hook_install::install`),
//!    so we detect which role we're playing from stdin and argv shape
//!    rather than needing a separate entry point.
#![deny(unsafe_code)]

use std::io::IsTerminal;

use anyhow::Context;
use clap::Parser;
use pre_push::{commands, Cli, Commands};
use pre_push_core::config::{load_manifest, ConfigLoader};
use tracing::debug;

mod observability;

/// Subcommand names recognized by [`Cli`] — anything else in argv[1] is
/// treated as a hook invocation's remote name.
const KNOWN_SUBCOMMANDS: &[&str] = &["install", "test", "list-uses", "help"];

fn main() -> anyhow::Result<()> {
    let argv: Vec<String> = std::env::args().collect();

    if is_hook_invocation(&argv) {
        return run_hook(&argv);
    }

    let cli = Cli::parse();
    cli.color.apply();

    if let Some(ref dir) = cli.chdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to {}", dir.display()))?;
    }

    let cwd = commands::current_dir_utf8()?;
    let mut loader = ConfigLoader::new().with_search_root(&cwd);
    if let Some(ref config_path) = cli.config {
        let config_path = camino::Utf8PathBuf::try_from(config_path.clone()).map_err(|e| {
            anyhow::anyhow!("config path is not valid UTF-8: {}", e.into_path_buf().display())
        })?;
        loader = loader.with_file(&config_path);
    }
    let config = loader.load().context("failed to load configuration")?;

    let mut obs_config = observability::ObservabilityConfig::from_env_with_overrides(
        config.log_dir.as_ref().map(|dir| dir.as_std_path().to_path_buf()),
    );
    obs_config.debug_stderr |= cli.debug;
    let env_filter = observability::env_filter(cli.quiet, cli.verbose, config.log_level.as_str());
    let _guard = observability::init_observability(&obs_config, env_filter)
        .context("failed to initialize logging/tracing")?;

    debug!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        json = cli.json,
        color = ?cli.color,
        chdir = ?cli.chdir,
        "CLI initialized"
    );

    let result = match cli.command {
        Commands::Install(args) => commands::install::cmd_install(args, cli.json),
        Commands::Test(args) => commands::test::cmd_test(args, cli.json),
        Commands::ListUses(args) => commands::list_uses::cmd_list_uses(args, cli.json),
    };

    if let Err(ref err) = result {
        tracing::error!(error = %err, "fatal error");
    }
    result
}

/// `true` if this invocation looks like git's hook-calling convention
/// rather than a recognized subcommand invocation. Per git's pre-push
/// protocol, the hook is always invoked with stdin piped (never a
/// terminal) and no subcommand name in argv[1] — argument parsing alone
/// would mistake `pre-push origin` (a plausible future subcommand name)
/// for a hook call, so both signals are required.
fn is_hook_invocation(argv: &[String]) -> bool {
    if std::io::stdin().is_terminal() {
        return false;
    }
    let Some(first) = argv.get(1) else {
        return false;
    };
    !first.starts_with('-') && !KNOWN_SUBCOMMANDS.contains(&first.as_str())
}

fn run_hook(argv: &[String]) -> anyhow::Result<()> {
    let remote_name = argv.get(1).cloned().unwrap_or_default();
    let remote_url = argv.get(2).cloned().unwrap_or_default();

    let cwd = commands::current_dir_utf8()?;
    let config = ConfigLoader::new()
        .with_search_root(&cwd)
        .load()
        .unwrap_or_default();

    let obs_config = observability::ObservabilityConfig::from_env_with_overrides(
        config.log_dir.as_ref().map(|dir| dir.as_std_path().to_path_buf()),
    );
    let env_filter = observability::env_filter(false, 0, config.log_level.as_str());
    let _guard = observability::init_observability(&obs_config, env_filter);

    debug!(hook_mode = true, %remote_name, "invoked as pre-push hook");

    let updates = pre_push_core::push::parse_updates(std::io::stdin().lock())
        .context("failed to parse pre-push hook input")?;
    let push = pre_push_core::push::classify(&remote_name, &remote_url, updates);

    let current_branch = pre_push_core::git::current_branch().unwrap_or_default();
    let current_tag = pre_push_core::git::current_tag().unwrap_or_default();
    let decision =
        pre_push_core::push::decide(&push, current_branch.as_deref(), current_tag.as_deref());

    match decision {
        pre_push_core::push::PushDecision::SkipDelete => {
            eprintln!("pre-push: skipping checks (ref deletion)");
            return Ok(());
        }
        pre_push_core::push::PushDecision::InvalidTag(tag) => {
            anyhow::bail!("pre-push: pushed tag '{tag}' does not satisfy tag semantics (expected a 'v'-prefixed version)");
        }
        pre_push_core::push::PushDecision::SkipNotCurrent => {
            eprintln!("pre-push: skipping checks (push is not of the currently checked-out ref)");
            return Ok(());
        }
        pre_push_core::push::PushDecision::Run => {}
    }

    let manifest = load_manifest(&cwd).context("failed to load manifest")?;
    let stage = manifest
        .get_stage("pre-push")
        .ok_or_else(|| anyhow::anyhow!("manifest has no 'pre-push' stage"))?;
    let graph = pre_push_core::graph::build_graph(stage, &manifest)
        .context("failed to build dependency graph")?;

    let (context, version) = commands::build_context(&manifest, &push)?;

    eprintln!("pre-push v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("checking {} v{version}", manifest.project.name);

    let parallelism = config.max_parallelism.unwrap_or_else(num_cpus::get);
    let summary = pre_push_core::scheduler::run_stage(
        &graph,
        &context,
        parallelism,
        &pre_push_core::scheduler::CancellationToken::new(),
    );

    let mut reporter = pre_push::reporter_cli::ColorReporter::new();
    pre_push_core::reporter::report(&mut reporter, &summary);

    if summary.has_error() {
        anyhow::bail!("pre-push checks failed");
    }

    Ok(())
}
