//! # Error Types
//!
//! Local validation errors raised before any network call, and the error kind
//! taxonomy used by run reports.

use serde::Serialize;
use thiserror::Error;

/// Errors raised while loading presets, settings documents or targets.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
  /// The preset name is not one of the built-in presets
  #[error("unknown preset '{name}' (expected one of: {expected})")]
  InvalidPreset { name: String, expected: String },

  /// The settings violate an invariant or could not be parsed
  #[error("invalid settings: {0}")]
  InvalidSettings(String),

  /// The branch target could not be parsed
  #[error("invalid branch target '{input}': {reason}")]
  InvalidTarget { input: String, reason: String },
}

impl ConfigError {
  /// The report-level kind of this error
  pub const fn kind(&self) -> ErrorKind {
    match self {
      ConfigError::InvalidPreset { .. } => ErrorKind::InvalidPreset,
      ConfigError::InvalidSettings(_) | ConfigError::InvalidTarget { .. } => ErrorKind::InvalidSettings,
    }
  }
}

/// Every kind of failure a run report can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  InvalidPreset,
  InvalidSettings,
  AuthError,
  NotFound,
  RateLimited,
  RemoteError,
  Timeout,
  Cancelled,
  /// Verification found remote state that differs from the preset
  Drift,
}

impl ErrorKind {
  /// Short lowercase label used in console output
  pub const fn as_str(&self) -> &'static str {
    match self {
      ErrorKind::InvalidPreset => "invalid_preset",
      ErrorKind::InvalidSettings => "invalid_settings",
      ErrorKind::AuthError => "auth_error",
      ErrorKind::NotFound => "not_found",
      ErrorKind::RateLimited => "rate_limited",
      ErrorKind::RemoteError => "remote_error",
      ErrorKind::Timeout => "timeout",
      ErrorKind::Cancelled => "cancelled",
      ErrorKind::Drift => "drift",
    }
  }
}

impl std::fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}
