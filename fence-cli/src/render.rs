//! # Report Rendering
//!
//! Console tables and JSON documents for run reports, protection states and
//! presets. JSON goes to stdout untouched so it can be piped; logs stay on
//! stderr.

use anyhow::{Context, Result};
use fence_core::output::{format_run_state, format_step_status, format_target, print_header};
use fence_core::{BranchTarget, ProtectionPreset, ProtectionState, print_error};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::apply::{ApplyResult, RunReport, RunState, Step, StepStatus, SubState};

/// How results are printed
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
  /// Human-readable tables
  #[default]
  Text,
  /// A JSON document on stdout
  Json,
}

#[derive(Tabled)]
struct StepRow {
  #[tabled(rename = "Step")]
  step: String,
  #[tabled(rename = "Status")]
  status: String,
  #[tabled(rename = "Before")]
  before: String,
  #[tabled(rename = "After")]
  after: String,
  #[tabled(rename = "Details")]
  details: String,
}

impl From<&ApplyResult> for StepRow {
  fn from(result: &ApplyResult) -> Self {
    let display = |state: &Option<SubState>| state.as_ref().map_or_else(|| "-".to_string(), ToString::to_string);

    let mut details = Vec::new();
    if let Some(error) = &result.error {
      details.push(error.to_string());
    }
    if result.attempts > 1 {
      details.push(format!("{} attempts", result.attempts));
    }

    Self {
      step: result.resource.to_string(),
      status: format_step_status(result.status.as_str()),
      before: display(&result.prior_state),
      after: if result.status == StepStatus::Applied || result.resource == Step::Verify {
        display(&result.new_state)
      } else {
        "-".to_string()
      },
      details: details.join("; "),
    }
  }
}

/// Table of a run's steps
pub fn report_table(report: &RunReport) -> String {
  let rows: Vec<StepRow> = report.steps.iter().map(StepRow::from).collect();
  Table::new(rows).with(Style::sharp()).to_string()
}

/// One-line outcome of a run
pub fn report_summary(report: &RunReport) -> String {
  let verb = if report.dry_run { "would apply" } else { "applied" };
  format!(
    "{}: {} ({} {verb}, {} unchanged, {} failed, {} cancelled)",
    format_target(&report.target.to_string()),
    format_run_state(report.state.as_str()),
    report.count(StepStatus::Applied),
    report.count(StepStatus::Unchanged),
    report.count(StepStatus::Failed),
    report.count(StepStatus::Cancelled),
  )
}

/// Print run reports in input order
pub fn print_reports(reports: &[RunReport], format: OutputFormat) -> Result<()> {
  match format {
    OutputFormat::Json => print_json(&reports),
    OutputFormat::Text => {
      for report in reports {
        let title = if report.dry_run { "Plan for" } else { "Applying to" };
        print_header(&format!("{title} {}", report.target));

        if report.state == RunState::Aborted {
          if let Some(reason) = &report.abort_reason {
            print_error(&format!("Aborted before contacting GitHub: {reason}"));
          }
        } else {
          println!("{}", report_table(report));
        }
        println!("{}", report_summary(report));
      }
      Ok(())
    }
  }
}

#[derive(Serialize)]
struct TargetState<'a> {
  target: &'a BranchTarget,
  protection: &'a ProtectionState,
}

#[derive(Tabled)]
struct SettingRow {
  #[tabled(rename = "Setting")]
  setting: &'static str,
  #[tabled(rename = "Value")]
  value: String,
}

fn on_off(enabled: bool) -> String {
  let label = if enabled { "on" } else { "off" };
  label.to_string()
}

/// Table of a branch's current protection
pub fn state_table(state: &ProtectionState) -> String {
  let reviews = state
    .pull_request_reviews
    .as_ref()
    .map_or_else(|| "not required".to_string(), ToString::to_string);

  let rows = vec![
    SettingRow {
      setting: "status checks",
      value: state.effective_status_checks().to_string(),
    },
    SettingRow {
      setting: "push restrictions",
      value: state.effective_restrictions().to_string(),
    },
    SettingRow {
      setting: "allow deletions",
      value: on_off(state.allow_deletions),
    },
    SettingRow {
      setting: "enforce admins",
      value: on_off(state.enforce_admins),
    },
    SettingRow {
      setting: "pull request reviews",
      value: reviews,
    },
    SettingRow {
      setting: "signed commits",
      value: on_off(state.required_signatures),
    },
    SettingRow {
      setting: "conversation resolution",
      value: on_off(state.required_conversation_resolution),
    },
  ];
  Table::new(rows).with(Style::sharp()).to_string()
}

/// Print the protection read from each target
pub fn print_states(states: &[(BranchTarget, ProtectionState)], format: OutputFormat) -> Result<()> {
  match format {
    OutputFormat::Json => {
      let docs: Vec<TargetState<'_>> = states
        .iter()
        .map(|(target, protection)| TargetState { target, protection })
        .collect();
      print_json(&docs)
    }
    OutputFormat::Text => {
      for (target, state) in states {
        print_header(&format!("Protection of {target}"));
        println!("{}", state_table(state));
      }
      Ok(())
    }
  }
}

/// Table of the values a preset resolves to
pub fn preset_table(preset: &ProtectionPreset) -> String {
  let contexts = if preset.required_contexts().is_empty() {
    "none".to_string()
  } else {
    preset.required_contexts().join(", ")
  };
  let push = if preset.restrict_push_to().is_empty() {
    "unrestricted".to_string()
  } else {
    preset
      .restrict_push_to()
      .iter()
      .map(ToString::to_string)
      .collect::<Vec<_>>()
      .join(", ")
  };

  let rows = vec![
    SettingRow {
      setting: "required_reviewers",
      value: preset.required_reviewers().to_string(),
    },
    SettingRow {
      setting: "dismiss_stale",
      value: on_off(preset.dismiss_stale()),
    },
    SettingRow {
      setting: "require_codeowners",
      value: on_off(preset.require_codeowners()),
    },
    SettingRow {
      setting: "required_contexts",
      value: contexts,
    },
    SettingRow {
      setting: "strict",
      value: on_off(preset.strict()),
    },
    SettingRow {
      setting: "require_conversation_resolution",
      value: on_off(preset.require_conversation_resolution()),
    },
    SettingRow {
      setting: "restrict_push_to",
      value: push,
    },
    SettingRow {
      setting: "allow_deletions",
      value: on_off(preset.allow_deletions()),
    },
    SettingRow {
      setting: "enforce_admins",
      value: on_off(preset.enforce_admins()),
    },
    SettingRow {
      setting: "require_signed_commits",
      value: on_off(preset.require_signed_commits()),
    },
  ];
  Table::new(rows).with(Style::sharp()).to_string()
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize output as JSON")?;
  println!("{json}");
  Ok(())
}
