//! Constants for the fence-gh client

pub use fence_core::consts::DEFAULT_API_URL as API_BASE_URL;

/// User-Agent header value for the GitHub API client
pub const USER_AGENT: &str = concat!("fence-cli/", env!("CARGO_PKG_VERSION"));

/// Accept header value for the GitHub API
pub const ACCEPT: &str = "application/vnd.github+json";

/// REST API version pinned by the client
pub const API_VERSION: &str = "2022-11-28";
