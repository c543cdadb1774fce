//! # Fence CLI Entry Point
//!
//! The main entry point for the fence command-line tool, which applies
//! branch-protection presets to GitHub branches.

use std::process::ExitCode;

use clap::Parser;
use fence_cli::cli::{Cli, handle_cli};
use fence_cli::consts::EXIT_PARTIALLY_FAILED;
use fence_core::print_error;
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> ExitCode {
  // Parse CLI arguments using the derive-based implementation
  let cmd = Cli::parse();

  // Set up tracing based on verbosity level
  let verbose_count = cmd.verbose;
  let level = match verbose_count {
    0 => tracing::Level::WARN,  // Default: warnings and errors
    1 => tracing::Level::INFO,  // -v: info, warnings, and errors
    2 => tracing::Level::DEBUG, // -vv: debug, info, warnings, and errors
    _ => tracing::Level::TRACE, // -vvv or more: trace and everything else
  };

  // Logs go to stderr so JSON reports on stdout stay parseable
  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(EnvFilter::from_default_env().add_directive(level.into()))
    .init();

  debug!("Tracing initialized with level: {}", level);

  match handle_cli(cmd) {
    Ok(code) => ExitCode::from(code),
    Err(err) => {
      print_error(&format!("{err:#}"));
      ExitCode::from(EXIT_PARTIALLY_FAILED)
    }
  }
}
