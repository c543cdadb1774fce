//! Environment variable management for testing
//!
//! Points XDG_CONFIG_HOME at a per-test temporary directory and clears the
//! variables fence reads for its API URL and token, restoring everything on
//! drop.

use std::env;
use std::path::PathBuf;

use tempfile::TempDir;

/// Variables saved and cleared for the lifetime of the guard
const ISOLATED_VARS: [&str; 4] = [EnvTestGuard::XDG_CONFIG_HOME, "FENCE_API_URL", "GITHUB_TOKEN", "GH_TOKEN"];

/// A test environment with its own config directory and no GitHub credentials
pub struct EnvTestGuard {
  /// The temporary directory backing XDG_CONFIG_HOME
  pub temp_dir: TempDir,
  original: Vec<(&'static str, Option<String>)>,
}

impl Default for EnvTestGuard {
  fn default() -> Self {
    Self::new()
  }
}

impl EnvTestGuard {
  pub const XDG_CONFIG_HOME: &'static str = "XDG_CONFIG_HOME";

  /// Create a new isolated test environment
  pub fn new() -> Self {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");

    let original = ISOLATED_VARS.iter().map(|var| (*var, env::var(var).ok())).collect();

    let config_home = temp_dir.path().join("config");
    std::fs::create_dir_all(&config_home).expect("Failed to create config directory");

    unsafe {
      for var in ISOLATED_VARS {
        env::remove_var(var);
      }
      env::set_var(Self::XDG_CONFIG_HOME, &config_home);
    }

    Self { temp_dir, original }
  }

  /// Get the path used as XDG_CONFIG_HOME
  pub fn config_home(&self) -> PathBuf {
    self.temp_dir.path().join("config")
  }

  /// Get the path fence resolves its config file to under this guard
  pub fn config_file(&self) -> PathBuf {
    self.config_home().join("fence").join("config.toml")
  }

  /// Set a variable for the rest of the guard's lifetime
  pub fn set(&self, var: &str, value: &str) {
    unsafe {
      env::set_var(var, value);
    }
  }
}

impl Drop for EnvTestGuard {
  fn drop(&mut self) {
    for (var, value) in &self.original {
      match value {
        Some(val) => unsafe {
          env::set_var(var, val);
        },
        None => unsafe {
          env::remove_var(var);
        },
      }
    }
  }
}
