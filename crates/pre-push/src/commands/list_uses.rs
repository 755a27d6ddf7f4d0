//! `list-uses` command — print every built-in `uses:` identifier this
//! runner recognizes, with a one-line description of what it checks.

use clap::Args;
use owo_colors::OwoColorize;
use pre_push_core::runner::BUILTIN_REGISTRY;
use tracing::instrument;

/// Arguments for the `list-uses` subcommand (currently none).
#[derive(Args, Debug, Default)]
pub struct ListUsesArgs {}

/// Run the `list-uses` subcommand.
#[instrument(skip(_args))]
pub fn cmd_list_uses(_args: ListUsesArgs, json: bool) -> anyhow::Result<()> {
    if json {
        let entries: Vec<_> = BUILTIN_REGISTRY
            .iter()
            .map(|(name, description)| serde_json::json!({ "name": name, "description": description }))
            .collect();
        println!("{}", serde_json::Value::Array(entries));
        return Ok(());
    }

    for (name, description) in BUILTIN_REGISTRY {
        println!("{} {}", name.bold(), format!("— {description}").dimmed());
    }

    Ok(())
}
