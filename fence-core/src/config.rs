//! # Configuration Management
//!
//! Handles the fence configuration file and its directory, including XDG base
//! directory support. A missing file means defaults; `FENCE_API_URL`
//! overrides the API base URL.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{
  DEFAULT_API_URL, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS, DEFAULT_TIMEOUT_SECS,
  ENV_API_URL,
};
use crate::preset::PresetName;

/// Represents the configuration directories for the fence application
#[derive(Debug, Clone)]
pub struct ConfigDirs {
  pub config_dir: PathBuf,
}

impl ConfigDirs {
  /// Create a new ConfigDirs instance
  pub fn new() -> Result<Self> {
    let proj_dirs = ProjectDirs::from("eddieland", "", "fence").context("Failed to determine project directories")?;

    Ok(Self {
      config_dir: proj_dirs.config_dir().to_path_buf(),
    })
  }

  /// Get the config directory
  pub fn config_dir(&self) -> &PathBuf {
    &self.config_dir
  }

  /// Get the path to the configuration file
  pub fn config_path(&self) -> PathBuf {
    self.config_dir.join("config.toml")
  }

  /// Write the default configuration file unless one already exists.
  /// Returns true when a new file was written.
  pub fn init(&self) -> Result<bool> {
    fs::create_dir_all(&self.config_dir).context("Failed to create config directory")?;

    let config_path = self.config_path();
    if config_path.exists() {
      return Ok(false);
    }

    FenceConfig::default().save(&config_path)?;
    Ok(true)
  }

  /// Load the configuration file, falling back to defaults when absent
  pub fn load_config(&self) -> Result<FenceConfig> {
    let config = FenceConfig::load(&self.config_path())?;
    Ok(config.with_env_overrides())
  }
}

/// Get the configuration directories
pub fn get_config_dirs() -> Result<ConfigDirs> {
  ConfigDirs::new()
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FenceConfig {
  pub github: GitHubSettings,
  pub retry: RetrySettings,
  pub defaults: DefaultSettings,
}

/// `[github]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubSettings {
  /// Base URL of the REST API, e.g. `https://ghe.example.com/api/v3`
  pub api_url: String,
  /// Per-request timeout
  pub timeout_secs: u64,
}

impl Default for GitHubSettings {
  fn default() -> Self {
    Self {
      api_url: DEFAULT_API_URL.to_string(),
      timeout_secs: DEFAULT_TIMEOUT_SECS,
    }
  }
}

/// `[retry]` section, applied to rate-limited steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
  pub max_attempts: u32,
  pub initial_delay_ms: u64,
  pub max_delay_ms: u64,
}

impl Default for RetrySettings {
  fn default() -> Self {
    Self {
      max_attempts: DEFAULT_MAX_ATTEMPTS,
      initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
      max_delay_ms: DEFAULT_MAX_DELAY_MS,
    }
  }
}

/// `[defaults]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultSettings {
  /// Preset used when neither `--preset` nor `--settings` is given
  pub preset: PresetName,
}

impl Default for DefaultSettings {
  fn default() -> Self {
    Self {
      preset: PresetName::Recommended,
    }
  }
}

impl FenceConfig {
  /// Read a configuration file; a missing file yields the defaults
  pub fn load(path: &Path) -> Result<Self> {
    if !path.exists() {
      debug!("No configuration file at {}, using defaults", path.display());
      return Ok(Self::default());
    }

    let content =
      fs::read_to_string(path).with_context(|| format!("Failed to read configuration from {}", path.display()))?;
    let config: FenceConfig =
      toml::from_str(&content).with_context(|| format!("Failed to parse configuration from {}", path.display()))?;

    debug!("Loaded configuration from {}", path.display());
    Ok(config)
  }

  /// Write this configuration as TOML
  pub fn save(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }

    let content = toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;
    fs::write(path, content).with_context(|| format!("Failed to write configuration to {}", path.display()))?;

    Ok(())
  }

  /// Apply environment overrides on top of the file
  pub fn with_env_overrides(mut self) -> Self {
    if let Ok(api_url) = std::env::var(ENV_API_URL)
      && !api_url.trim().is_empty()
    {
      debug!("Using API URL from {ENV_API_URL}");
      self.github.api_url = api_url.trim().to_string();
    }
    self
  }
}
