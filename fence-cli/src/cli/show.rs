//! # Show Command
//!
//! Reads and prints the current protection of one or more branches.

use anyhow::{Context, Result};
use clap::Args;
use fence_core::{BranchTarget, get_config_dirs};
use tokio::runtime::Runtime;

use crate::clients::create_github_client_from_config;
use crate::consts::EXIT_COMPLETED;
use crate::render::{OutputFormat, print_states};

/// Command for showing current protection
#[derive(Args)]
pub struct ShowArgs {
  /// Branches to inspect (owner/repo:branch or a GitHub branch URL)
  #[arg(required = true, value_name = "TARGET")]
  pub targets: Vec<String>,

  /// Output format
  #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
  pub format: OutputFormat,
}

pub(crate) fn handle_show_command(args: ShowArgs) -> Result<u8> {
  let targets = args
    .targets
    .iter()
    .map(|target| target.parse::<BranchTarget>())
    .collect::<Result<Vec<_>, _>>()
    .context("Invalid target")?;

  let config = get_config_dirs()?.load_config().context("Failed to load configuration")?;
  let client = create_github_client_from_config(&config)?;
  let rt = Runtime::new().context("Failed to create async runtime")?;

  let mut states = Vec::with_capacity(targets.len());
  for target in targets {
    let state = rt
      .block_on(client.get_protection(&target))
      .with_context(|| format!("Failed to read protection of {target}"))?;
    states.push((target, state));
  }

  print_states(&states, args.format)?;
  Ok(EXIT_COMPLETED)
}
