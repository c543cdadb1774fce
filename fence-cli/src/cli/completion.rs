//! # Completion Command
//!
//! Derive-based implementation of the completion command for generating
//! shell completion scripts.

use std::io;

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{Shell, generate};

use super::Cli;
use crate::consts::EXIT_COMPLETED;

/// Command for generating shell completions
#[derive(Args)]
pub struct CompletionArgs {
  /// Shell to generate completions for
  #[arg(required = true, value_enum)]
  pub shell: Shell,
}

pub(crate) fn handle_completion_command(completion: CompletionArgs) -> Result<u8> {
  generate_completions(completion.shell);
  Ok(EXIT_COMPLETED)
}

/// Write the completion script for `shell` to stdout
pub fn generate_completions(shell: Shell) {
  let mut cmd = Cli::command();
  let app_name = cmd.get_name().to_string();

  generate(shell, &mut cmd, app_name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
  use clap_complete::Shell;

  use super::*;

  #[test]
  fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
  }

  #[test]
  fn test_generate_completions_succeeds() {
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell] {
      generate_completions(shell);
    }
  }
}
