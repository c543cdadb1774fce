//! # Apply and Plan Commands
//!
//! Resolves the preset source and targets, runs the applier against GitHub
//! and prints one report per target. Ctrl-C cancels the run between steps.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use fence_core::{
  BranchTarget, ConfigError, FenceConfig, PresetSource, SettingsFormat, get_config_dirs, parse_settings_document,
  print_error,
};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::apply::{Applier, RetryConfig, RunReport, RunState, StepError};
use crate::clients::create_github_client_from_config;
use crate::consts::EXIT_ABORTED;
use crate::render::{OutputFormat, print_reports};

/// Arguments shared by `apply` and `plan`
#[derive(Args)]
pub struct ApplyArgs {
  /// Branches to protect (owner/repo:branch or a GitHub branch URL)
  #[arg(required = true, value_name = "TARGET")]
  pub targets: Vec<String>,

  /// Built-in preset to apply (minimal, recommended, strict)
  #[arg(long, short = 'p', value_name = "NAME", conflicts_with = "settings")]
  pub preset: Option<String>,

  /// Settings document to apply (TOML, or JSON by extension)
  #[arg(long, short = 's', value_name = "FILE")]
  pub settings: Option<PathBuf>,

  /// Format of the settings document, overriding the file extension
  #[arg(long, value_enum, requires = "settings")]
  pub settings_format: Option<SettingsFormat>,

  /// Required status check context; replaces the preset's list
  #[arg(long = "context", value_name = "CONTEXT")]
  pub contexts: Vec<String>,

  /// Required approving reviews; replaces the preset's count
  #[arg(long, value_name = "N", allow_negative_numbers = true)]
  pub reviewers: Option<i64>,

  /// Actor allowed to push (user:NAME, team:SLUG or app:SLUG); replaces the preset's list
  #[arg(long = "restrict", value_name = "ACTOR")]
  pub restrict: Vec<String>,

  /// Output format
  #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
  pub format: OutputFormat,
}

impl ApplyArgs {
  /// The preset source with command-line overrides layered on top
  fn preset_source(&self, config: &FenceConfig) -> Result<PresetSource, ConfigError> {
    let source = match (&self.settings, &self.preset) {
      (Some(path), _) => {
        let format = self.settings_format.unwrap_or_else(|| SettingsFormat::from_path(path));
        let text = fs::read_to_string(path)
          .map_err(|e| ConfigError::InvalidSettings(format!("cannot read {}: {e}", path.display())))?;
        PresetSource::Settings(parse_settings_document(&text, format)?)
      }
      (None, Some(name)) => PresetSource::Named(name.clone()),
      (None, None) => PresetSource::Named(config.defaults.preset.as_str().to_string()),
    };

    if self.contexts.is_empty() && self.reviewers.is_none() && self.restrict.is_empty() {
      return Ok(source);
    }

    let mut settings = source.into_settings();
    if !self.contexts.is_empty() {
      settings.required_contexts = Some(self.contexts.clone());
    }
    if let Some(reviewers) = self.reviewers {
      settings.required_reviewers = Some(reviewers);
    }
    if !self.restrict.is_empty() {
      settings.restrict_push_to = Some(self.restrict.clone());
    }
    Ok(PresetSource::Settings(settings))
  }

  fn parse_targets(&self) -> Result<Vec<BranchTarget>, ConfigError> {
    self.targets.iter().map(|target| target.parse()).collect()
  }
}

pub(crate) fn handle_apply_command(args: ApplyArgs, dry_run: bool) -> Result<u8> {
  let config = get_config_dirs()?.load_config().context("Failed to load configuration")?;

  let targets = match args.parse_targets() {
    Ok(targets) => targets,
    Err(err) => {
      print_error(&format!("Invalid target: {err}"));
      return Ok(EXIT_ABORTED);
    }
  };

  let source = match args.preset_source(&config).and_then(|source| source.load().map(|_| source)) {
    Ok(source) => source,
    Err(err) => {
      let reason = StepError::from(&err);
      let reports: Vec<RunReport> = targets
        .into_iter()
        .map(|target| RunReport::aborted(target, reason.clone(), dry_run))
        .collect();
      print_reports(&reports, args.format)?;
      return Ok(EXIT_ABORTED);
    }
  };
  debug!("Applying {source:?} to {} target(s)", targets.len());

  let client = create_github_client_from_config(&config)?;
  let applier = Applier::new(Arc::new(client))
    .with_retry(RetryConfig::from_settings(&config.retry))
    .with_dry_run(dry_run);

  let rt = Runtime::new().context("Failed to create async runtime")?;
  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  rt.spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("Interrupted, cancelling after the current step");
      on_interrupt.cancel();
    }
  });

  let reports = rt.block_on(applier.run_all(&targets, &source, &cancel));
  print_reports(&reports, args.format)?;

  Ok(RunState::worst(reports.iter().map(|report| report.state)).exit_code())
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use fence_core::ProtectionSettings;

  use super::*;

  fn args(extra: impl FnOnce(&mut ApplyArgs)) -> ApplyArgs {
    let mut args = ApplyArgs {
      targets: vec!["octo/service:main".to_string()],
      preset: None,
      settings: None,
      settings_format: None,
      contexts: vec![],
      reviewers: None,
      restrict: vec![],
      format: OutputFormat::Text,
    };
    extra(&mut args);
    args
  }

  #[test]
  fn test_default_preset_comes_from_config() {
    let source = args(|_| {}).preset_source(&FenceConfig::default()).unwrap();
    assert_eq!(source, PresetSource::Named("recommended".to_string()));
  }

  #[test]
  fn test_overrides_extend_the_named_preset() {
    let source = args(|a| {
      a.preset = Some("strict".to_string());
      a.contexts = vec!["build".to_string()];
      a.reviewers = Some(3);
    })
    .preset_source(&FenceConfig::default())
    .unwrap();

    assert_eq!(
      source,
      PresetSource::Settings(ProtectionSettings {
        extends: Some("strict".to_string()),
        required_reviewers: Some(3),
        required_contexts: Some(vec!["build".to_string()]),
        ..Default::default()
      })
    );
    let preset = source.load().unwrap();
    assert_eq!(preset.required_reviewers(), 3);
    assert!(preset.enforce_admins());
  }

  #[test]
  fn test_settings_file_is_parsed() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    writeln!(file, r#"{{"extends": "minimal", "enforce_admins": true}}"#).unwrap();

    let source = args(|a| a.settings = Some(file.path().to_path_buf()))
      .preset_source(&FenceConfig::default())
      .unwrap();
    let preset = source.load().unwrap();

    assert_eq!(preset.required_reviewers(), 1);
    assert!(preset.enforce_admins());
  }

  #[test]
  fn test_unreadable_settings_file_is_invalid_settings() {
    let err = args(|a| a.settings = Some(PathBuf::from("/definitely/not/here.toml")))
      .preset_source(&FenceConfig::default())
      .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSettings(_)));
  }

  #[test]
  fn test_bad_target_is_rejected() {
    let err = args(|a| a.targets = vec!["not a target".to_string()])
      .parse_targets()
      .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidTarget { .. }));
  }
}
