//! Constants shared across the fence workspace

/// Base URL for the official SaaS GitHub API
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Environment variable overriding the GitHub API base URL
pub const ENV_API_URL: &str = "FENCE_API_URL";

/// Environment variables consulted for the GitHub token, in order
pub const ENV_TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of attempts for a rate-limited step
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default initial backoff delay in milliseconds
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1_000;

/// Default backoff cap in milliseconds
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// GitHub's upper bound for required approving reviews
pub const MAX_REQUIRED_REVIEWERS: i64 = 6;
