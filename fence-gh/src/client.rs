//! # GitHub HTTP Client
//!
//! HTTP client implementation for the branch-protection endpoints, handling
//! authentication, URL building, per-call timeouts and mapping responses onto
//! [`ProtectionError`].

use std::time::Duration;

use fence_core::BranchTarget;
use fence_core::consts::DEFAULT_TIMEOUT_SECS;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::consts::{ACCEPT, API_BASE_URL, API_VERSION, USER_AGENT};
use crate::error::ProtectionError;
use crate::models::GitHubAuth;

/// Represents a GitHub API client
#[derive(Debug, Clone)]
pub struct GitHubClient {
  pub(crate) client: Client,
  pub(crate) base_url: String,
  pub(crate) auth: GitHubAuth,
  pub(crate) timeout: Duration,
}

impl GitHubClient {
  /// Create a new GitHub client against api.github.com
  pub fn new(auth: GitHubAuth) -> Self {
    Self {
      client: Client::new(),
      base_url: API_BASE_URL.to_string(),
      auth,
      timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
  }

  /// Point the client at another API root (GitHub Enterprise, test servers)
  pub fn with_base_url(mut self, base_url: &str) -> Self {
    self.base_url = base_url.trim_end_matches('/').to_string();
    self
  }

  /// Bound every request by `timeout`
  pub const fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  pub const fn timeout(&self) -> Duration {
    self.timeout
  }

  /// `{base}/repos/{owner}/{repo}/branches/{branch}/protection[/suffix...]`
  ///
  /// Segments are percent-encoded, so branch names containing `/` stay a
  /// single path segment.
  pub(crate) fn protection_url(&self, target: &BranchTarget, suffix: &[&str]) -> Result<Url, ProtectionError> {
    let mut url = Url::parse(&self.base_url).map_err(|e| ProtectionError::Remote {
      status: None,
      message: format!("invalid API base URL '{}': {e}", self.base_url),
    })?;

    url
      .path_segments_mut()
      .map_err(|()| ProtectionError::Remote {
        status: None,
        message: format!("API base URL '{}' cannot carry a path", self.base_url),
      })?
      .pop_if_empty()
      .extend(["repos", target.owner(), target.repo(), "branches", target.branch(), "protection"])
      .extend(suffix);

    Ok(url)
  }

  /// Build an authenticated request with the standard GitHub headers
  pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
    self
      .client
      .request(method, url)
      .header("Accept", ACCEPT)
      .header("User-Agent", USER_AGENT)
      .header("X-GitHub-Api-Version", API_VERSION)
      .bearer_auth(&self.auth.token)
      .timeout(self.timeout)
  }

  /// Send a request and classify any failure
  pub(crate) async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, ProtectionError> {
    let response = request.send().await.map_err(|e| ProtectionError::from_transport(&e))?;
    let status = response.status();
    debug!("{what}: HTTP {status}");

    if status.is_success() {
      return Ok(response);
    }

    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    Err(ProtectionError::from_response(status, &headers, &body))
  }

  /// Decode a successful JSON body
  pub(crate) async fn json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ProtectionError> {
    let body = response.text().await.map_err(|e| ProtectionError::from_transport(&e))?;
    serde_json::from_str::<T>(&body).map_err(|e| ProtectionError::Remote {
      status: None,
      message: format!("Failed to parse {what}: {e}"),
    })
  }
}

/// Create a GitHub client from a token
pub fn create_github_client(token: &str) -> GitHubClient {
  GitHubClient::new(GitHubAuth {
    token: token.to_string(),
  })
}
