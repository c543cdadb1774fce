//! # Config Command
//!
//! Writes the default configuration file and reports where it lives.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use fence_core::output::format_command;
use fence_core::{get_config_dirs, print_info, print_success};

use crate::consts::EXIT_COMPLETED;

/// Command for managing the configuration file
#[derive(Args)]
pub struct ConfigArgs {
  /// The subcommand to execute
  #[command(subcommand)]
  pub subcommand: ConfigSubcommands,
}

/// Subcommands for the config command
#[derive(Subcommand)]
pub enum ConfigSubcommands {
  /// Write the default configuration file if none exists
  Init,

  /// Print the path of the configuration file
  Path,
}

pub(crate) fn handle_config_command(args: ConfigArgs) -> Result<u8> {
  let config_dirs = get_config_dirs()?;

  match args.subcommand {
    ConfigSubcommands::Init => {
      let path = config_dirs.config_path();
      if config_dirs.init().context("Failed to initialize configuration")? {
        print_success(&format!("Wrote default configuration to {}", path.display()));
      } else {
        print_info(&format!(
          "Configuration already exists at {}; see {}",
          path.display(),
          format_command("fence config path")
        ));
      }
    }
    ConfigSubcommands::Path => println!("{}", config_dirs.config_path().display()),
  }
  Ok(EXIT_COMPLETED)
}
