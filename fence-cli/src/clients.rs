//! # Client Creation
//!
//! Builds the authenticated GitHub client from the configuration file and
//! the token in the environment.

use std::time::Duration;

use anyhow::{Result, bail};
use fence_core::FenceConfig;
use fence_core::consts::ENV_TOKEN_VARS;
use fence_gh::{GitHubClient, create_github_client, token_from_env};
use tracing::debug;

/// Create a GitHub client for the configured API URL and timeout
pub fn create_github_client_from_config(config: &FenceConfig) -> Result<GitHubClient> {
  let Some(token) = token_from_env() else {
    bail!(
      "No GitHub token found. Set {} to a token with admin access to the repository.",
      ENV_TOKEN_VARS.join(" or ")
    );
  };

  debug!(
    "Using GitHub API at {} with a {}s timeout",
    config.github.api_url, config.github.timeout_secs
  );

  Ok(
    create_github_client(&token)
      .with_base_url(&config.github.api_url)
      .with_timeout(Duration::from_secs(config.github.timeout_secs)),
  )
}
