//! # Protection API Errors
//!
//! Classification of failed GitHub calls. Only [`ProtectionError::RateLimited`]
//! is retryable; the client itself never retries.

use std::time::Duration;

use fence_core::ErrorKind;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use thiserror::Error;

/// Errors that can occur during a single branch-protection call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtectionError {
  /// 401, or 403 without rate-limit signals
  #[error("authentication failed (HTTP {status}): {message}")]
  Auth { status: u16, message: String },

  /// The repository, branch or protection sub-resource does not exist
  #[error("not found: {message}")]
  NotFound { message: String },

  /// Primary or secondary rate limit; `retry_after` is GitHub's hint when given
  #[error("rate limited: {message}")]
  RateLimited {
    retry_after: Option<Duration>,
    message: String,
  },

  /// The request did not complete within the client timeout
  #[error("request timed out: {message}")]
  Timeout { message: String },

  /// Any other non-2xx response, transport failure or undecodable body
  #[error("remote error: {message}")]
  Remote { status: Option<u16>, message: String },
}

impl ProtectionError {
  /// The report-level kind of this error
  pub const fn kind(&self) -> ErrorKind {
    match self {
      ProtectionError::Auth { .. } => ErrorKind::AuthError,
      ProtectionError::NotFound { .. } => ErrorKind::NotFound,
      ProtectionError::RateLimited { .. } => ErrorKind::RateLimited,
      ProtectionError::Timeout { .. } => ErrorKind::Timeout,
      ProtectionError::Remote { .. } => ErrorKind::RemoteError,
    }
  }

  /// Whether the caller may retry after [`ProtectionError::retry_after`]
  pub const fn is_retryable(&self) -> bool {
    matches!(self, ProtectionError::RateLimited { .. })
  }

  /// GitHub's retry hint, if any
  pub const fn retry_after(&self) -> Option<Duration> {
    match self {
      ProtectionError::RateLimited { retry_after, .. } => *retry_after,
      _ => None,
    }
  }

  /// Classify a non-2xx response
  pub(crate) fn from_response(status: StatusCode, headers: &HeaderMap, body: &str) -> Self {
    let message = extract_message(body).unwrap_or_else(|| format!("HTTP {status}"));

    if is_rate_limited(status, headers, &message) {
      return ProtectionError::RateLimited {
        retry_after: retry_after_hint(headers),
        message,
      };
    }

    match status {
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProtectionError::Auth {
        status: status.as_u16(),
        message,
      },
      StatusCode::NOT_FOUND => ProtectionError::NotFound { message },
      _ => ProtectionError::Remote {
        status: Some(status.as_u16()),
        message: format!("HTTP {status} - {message}"),
      },
    }
  }

  /// Classify a transport-level failure
  pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
    if err.is_timeout() {
      ProtectionError::Timeout { message: err.to_string() }
    } else {
      ProtectionError::Remote {
        status: err.status().map(|s| s.as_u16()),
        message: err.to_string(),
      }
    }
  }
}

/// Pull GitHub's `message` field out of an error body
fn extract_message(body: &str) -> Option<String> {
  let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
  json.get("message").and_then(|m| m.as_str()).map(str::to_string)
}

fn is_rate_limited(status: StatusCode, headers: &HeaderMap, message: &str) -> bool {
  if status == StatusCode::TOO_MANY_REQUESTS {
    return true;
  }
  if status != StatusCode::FORBIDDEN {
    return false;
  }

  let exhausted = headers
    .get("x-ratelimit-remaining")
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| v.trim() == "0");

  exhausted || headers.contains_key("retry-after") || message.to_ascii_lowercase().contains("rate limit")
}

/// `Retry-After` seconds, else the distance to `x-ratelimit-reset`
fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
  let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim);

  if let Some(seconds) = header("retry-after").and_then(|v| v.parse::<u64>().ok()) {
    return Some(Duration::from_secs(seconds));
  }

  let reset = header("x-ratelimit-reset").and_then(|v| v.parse::<i64>().ok())?;
  let now = chrono::Utc::now().timestamp();
  Some(Duration::from_secs(u64::try_from(reset - now).unwrap_or(0)))
}
