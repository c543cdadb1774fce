//! # Presets Command
//!
//! Lists the built-in presets and prints the values one resolves to.

use anyhow::Result;
use clap::{Args, Subcommand};
use fence_core::output::print_header;
use fence_core::{PresetName, load_preset};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::consts::EXIT_COMPLETED;
use crate::render::{OutputFormat, preset_table, print_json};

/// Command for inspecting presets
#[derive(Args)]
pub struct PresetsArgs {
  /// The subcommand to execute
  #[command(subcommand)]
  pub subcommand: PresetsSubcommands,
}

/// Subcommands for the presets command
#[derive(Subcommand)]
pub enum PresetsSubcommands {
  /// List the built-in presets
  #[command(alias = "ls")]
  List {
    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },

  /// Show the settings a preset resolves to
  Show {
    /// Preset name
    #[arg(value_name = "NAME")]
    name: String,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },
}

#[derive(Tabled, Serialize)]
struct PresetRow {
  #[tabled(rename = "Preset")]
  name: &'static str,
  #[tabled(rename = "Summary")]
  summary: &'static str,
}

pub(crate) fn handle_presets_command(args: PresetsArgs) -> Result<u8> {
  match args.subcommand {
    PresetsSubcommands::List { format } => {
      let rows: Vec<PresetRow> = PresetName::ALL
        .iter()
        .map(|preset| PresetRow {
          name: preset.as_str(),
          summary: preset.summary(),
        })
        .collect();

      match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Text => println!("{}", Table::new(rows).with(Style::sharp())),
      }
    }
    PresetsSubcommands::Show { name, format } => {
      let preset = load_preset(&name)?;
      match format {
        OutputFormat::Json => print_json(&preset)?,
        OutputFormat::Text => {
          print_header(&format!("Preset {}", name.to_lowercase()));
          println!("{}", preset_table(&preset));
        }
      }
    }
  }
  Ok(EXIT_COMPLETED)
}
