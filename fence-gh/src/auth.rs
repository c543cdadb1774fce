//! Authentication helpers for the GitHub client.
//!
//! Tokens are supplied by the environment (`GITHUB_TOKEN`, then `GH_TOKEN`),
//! which is what CI systems and the `gh` CLI already export.

use fence_core::consts::ENV_TOKEN_VARS;

/// Read a GitHub token from the environment, skipping blank values
pub fn token_from_env() -> Option<String> {
  ENV_TOKEN_VARS
    .iter()
    .filter_map(|var| std::env::var(var).ok())
    .map(|token| token.trim().to_string())
    .find(|token| !token.is_empty())
}
