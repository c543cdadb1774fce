//! # Command Line Interface
//!
//! Defines the CLI structure and command handlers for the fence tool.

mod apply;
mod completion;
mod config;
mod presets;
mod show;

use anyhow::Result;
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{ArgAction, Parser, Subcommand};
use fence_core::ColorMode;

/// Top-level CLI command for the fence tool
#[derive(Parser)]
#[command(name = "fence")]
#[command(display_name = "🚧 Fence")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(about = "Declarative, idempotent GitHub branch protection")]
#[command(
  long_about = "Fence applies a branch-protection preset to one or more GitHub branches.\n\n\
        Each protection sub-resource is compared with the desired value and only\n\
        overwritten when it differs, so running the same command twice changes\n\
        nothing the second time."
)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
#[command(subcommand_required(true))]
#[command(disable_help_subcommand = true)]
#[command(max_term_width = 120)]
#[command(styles = Styles::styled()
    .header(AnsiColor::BrightGreen.on_default().bold().underline())
    .usage(AnsiColor::Green.on_default().bold())
    .literal(AnsiColor::BrightGreen.on_default().bold())
    .placeholder(AnsiColor::BrightWhite.on_default().italic())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::BrightRed.on_default().bold())
)]
pub struct Cli {
  /// Sets the level of verbosity (can be used multiple times)
  #[arg(
    short = 'v',
    long = "verbose",
    action = ArgAction::Count,
    global = true,
    long_help = "Sets the level of verbosity for tracing and logging output.\n\n\
             -v: Show info level messages\n\
             -vv: Show debug level messages\n\
             -vvv: Show trace level messages"
  )]
  pub verbose: u8,

  /// Controls when colored output is used
  #[arg(
    long,
    value_enum,
    ignore_case = true,
    global = true,
    default_value_t = ColorMode::Auto,
  )]
  pub colors: ColorMode,

  /// Subcommands
  #[command(subcommand)]
  pub command: Commands,
}

/// Subcommands for the fence tool
#[derive(Subcommand)]
pub enum Commands {
  /// Apply a protection preset to branches
  #[command(long_about = "Apply a protection preset or settings file to one or more branches.\n\n\
            Targets are written as owner/repo:branch or as a GitHub branch URL.\n\
            Steps run in a fixed order and a final read verifies the result.\n\n\
            Exit status: 0 completed, 1 partially failed, 3 aborted, 130 cancelled.")]
  Apply(apply::ApplyArgs),

  /// Show what apply would change without writing anything
  #[command(long_about = "Compare branches with a preset and report what apply would change.\n\n\
            Takes the same arguments as apply. Only read calls are made.")]
  Plan(apply::ApplyArgs),

  /// Show the current protection of branches
  Show(show::ShowArgs),

  /// List and inspect the built-in presets
  #[command(arg_required_else_help = true)]
  Presets(presets::PresetsArgs),

  /// Manage the configuration file
  #[command(arg_required_else_help = true)]
  Config(config::ConfigArgs),

  /// Generate shell completions
  #[command(long_about = "Generates shell completion scripts for fence commands.\n\n\
            This command generates completion scripts that provide tab completion for fence\n\
            commands and options in your shell.")]
  Completion(completion::CompletionArgs),
}

/// Run the parsed command, returning the process exit status
pub fn handle_cli(cli: Cli) -> Result<u8> {
  cli.colors.apply();

  match cli.command {
    Commands::Apply(args) => apply::handle_apply_command(args, false),
    Commands::Plan(args) => apply::handle_apply_command(args, true),
    Commands::Show(args) => show::handle_show_command(args),
    Commands::Presets(args) => presets::handle_presets_command(args),
    Commands::Config(args) => config::handle_config_command(args),
    Commands::Completion(args) => completion::handle_completion_command(args),
  }
}
