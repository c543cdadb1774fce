//! # Settings Documents
//!
//! Explicit protection settings supplied as TOML or JSON. Every field is
//! optional; missing fields are taken from the preset named by `extends`, or
//! from an all-off base when no preset is extended. Validation turns the
//! document into a [`ProtectionPreset`].
//!
//! ```toml
//! extends = "recommended"
//! required_reviewers = 2
//! required_contexts = ["build", "test"]
//! restrict_push_to = ["team:release", "app:deployer"]
//! ```

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::consts::MAX_REQUIRED_REVIEWERS;
use crate::error::ConfigError;
use crate::preset::{ProtectionPreset, load_preset};

/// Unvalidated protection settings as written by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtectionSettings {
  /// Built-in preset supplying values for missing fields
  #[serde(skip_serializing_if = "Option::is_none")]
  pub extends: Option<String>,
  /// Signed so that negative counts reach validation instead of the parser
  #[serde(skip_serializing_if = "Option::is_none")]
  pub required_reviewers: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub dismiss_stale: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub require_codeowners: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub required_contexts: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub strict: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub require_conversation_resolution: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub restrict_push_to: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub allow_deletions: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub enforce_admins: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub require_signed_commits: Option<bool>,
}

impl ProtectionSettings {
  /// Settings that extend a named preset without changing anything
  pub fn extending(preset: &str) -> Self {
    Self {
      extends: Some(preset.to_string()),
      ..Default::default()
    }
  }
}

impl From<&ProtectionPreset> for ProtectionSettings {
  fn from(preset: &ProtectionPreset) -> Self {
    Self {
      extends: None,
      required_reviewers: Some(i64::from(preset.required_reviewers)),
      dismiss_stale: Some(preset.dismiss_stale),
      require_codeowners: Some(preset.require_codeowners),
      required_contexts: Some(preset.required_contexts.clone()),
      strict: Some(preset.strict),
      require_conversation_resolution: Some(preset.require_conversation_resolution),
      restrict_push_to: Some(preset.restrict_push_to.iter().map(ToString::to_string).collect()),
      allow_deletions: Some(preset.allow_deletions),
      enforce_admins: Some(preset.enforce_admins),
      require_signed_commits: Some(preset.require_signed_commits),
    }
  }
}

/// Where a run's settings come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetSource {
  /// A built-in preset by name
  Named(String),
  /// An explicit settings document
  Settings(ProtectionSettings),
}

impl PresetSource {
  /// Validate the source into a preset. Never touches the network.
  pub fn load(&self) -> Result<ProtectionPreset, ConfigError> {
    match self {
      PresetSource::Named(name) => load_preset(name),
      PresetSource::Settings(settings) => load_settings(settings),
    }
  }

  /// Fold this source into settings so per-field overrides can be layered on
  pub fn into_settings(self) -> ProtectionSettings {
    match self {
      PresetSource::Named(name) => ProtectionSettings::extending(&name),
      PresetSource::Settings(settings) => settings,
    }
  }
}

/// Validate a settings document into a preset
pub fn load_settings(settings: &ProtectionSettings) -> Result<ProtectionPreset, ConfigError> {
  let base = match settings.extends.as_deref() {
    Some(name) => load_preset(name)?,
    None => ProtectionPreset::unprotected(),
  };

  let required_reviewers = match settings.required_reviewers {
    Some(count) => validate_reviewers(count)?,
    None => base.required_reviewers,
  };
  let required_contexts = match &settings.required_contexts {
    Some(contexts) => validate_contexts(contexts)?,
    None => base.required_contexts,
  };
  let restrict_push_to = match &settings.restrict_push_to {
    Some(actors) => parse_actors(actors)?,
    None => base.restrict_push_to,
  };

  Ok(ProtectionPreset {
    required_reviewers,
    dismiss_stale: settings.dismiss_stale.unwrap_or(base.dismiss_stale),
    require_codeowners: settings.require_codeowners.unwrap_or(base.require_codeowners),
    required_contexts,
    strict: settings.strict.unwrap_or(base.strict),
    require_conversation_resolution: settings
      .require_conversation_resolution
      .unwrap_or(base.require_conversation_resolution),
    restrict_push_to,
    allow_deletions: settings.allow_deletions.unwrap_or(base.allow_deletions),
    enforce_admins: settings.enforce_admins.unwrap_or(base.enforce_admins),
    require_signed_commits: settings.require_signed_commits.unwrap_or(base.require_signed_commits),
  })
}

fn validate_reviewers(count: i64) -> Result<u8, ConfigError> {
  if !(0..=MAX_REQUIRED_REVIEWERS).contains(&count) {
    return Err(ConfigError::InvalidSettings(format!(
      "required_reviewers must be between 0 and {MAX_REQUIRED_REVIEWERS}, got {count}"
    )));
  }
  u8::try_from(count).map_err(|e| ConfigError::InvalidSettings(format!("required_reviewers: {e}")))
}

fn validate_contexts(contexts: &[String]) -> Result<Vec<String>, ConfigError> {
  let mut seen = HashSet::new();
  for context in contexts {
    if context.trim().is_empty() {
      return Err(ConfigError::InvalidSettings(
        "required_contexts must not contain empty entries".to_string(),
      ));
    }
    if !seen.insert(context.as_str()) {
      return Err(ConfigError::InvalidSettings(format!(
        "required_contexts contains '{context}' more than once"
      )));
    }
  }
  Ok(contexts.to_vec())
}

fn parse_actors(actors: &[String]) -> Result<BTreeSet<Actor>, ConfigError> {
  actors.iter().map(|actor| actor.parse::<Actor>()).collect()
}

/// Serialization format of a settings document
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
  Toml,
  Json,
}

impl SettingsFormat {
  /// Pick the format from a file extension, defaulting to TOML
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|ext| ext.to_str()) {
      Some(ext) if ext.eq_ignore_ascii_case("json") => SettingsFormat::Json,
      _ => SettingsFormat::Toml,
    }
  }
}

/// Parse a settings document without validating it
pub fn parse_settings_document(text: &str, format: SettingsFormat) -> Result<ProtectionSettings, ConfigError> {
  match format {
    SettingsFormat::Toml => toml::from_str(text).map_err(|e| ConfigError::InvalidSettings(e.to_string())),
    SettingsFormat::Json => serde_json::from_str(text).map_err(|e| ConfigError::InvalidSettings(e.to_string())),
  }
}
