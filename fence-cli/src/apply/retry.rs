//! Exponential backoff for rate-limited steps.
//!
//! Only [`fence_gh::ProtectionError::RateLimited`] is retried. The wait before
//! the next attempt is the larger of GitHub's hint and the backoff delay. A
//! hint longer than `max_delay` is not worth waiting for: retrying sooner
//! would be rejected again, so the step gives up instead.

use std::time::Duration;

use fence_core::config::RetrySettings;

/// Configuration for exponential backoff retry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
  /// Attempts per step, including the first one.
  pub max_attempts: u32,

  /// Delay before the first retry.
  pub initial_delay: Duration,

  /// Cap for the exponential delay and the longest hint worth waiting for.
  pub max_delay: Duration,

  /// Multiplier for exponential backoff.
  pub backoff_multiplier: f64,
}

impl RetryConfig {
  /// 3 attempts, retrying after 1s then 2s, never waiting more than 30s.
  pub const DEFAULT: Self = Self {
    max_attempts: 3,
    initial_delay: Duration::from_secs(1),
    max_delay: Duration::from_secs(30),
    backoff_multiplier: 2.0,
  };

  pub const fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
    Self {
      max_attempts,
      initial_delay,
      max_delay,
      backoff_multiplier: 2.0,
    }
  }

  /// Build from the `[retry]` section of the configuration file
  pub fn from_settings(settings: &RetrySettings) -> Self {
    Self::new(
      settings.max_attempts.max(1),
      Duration::from_millis(settings.initial_delay_ms),
      Duration::from_millis(settings.max_delay_ms),
    )
  }

  /// Backoff delay before retry number `retry` (0-indexed).
  ///
  /// `initial_delay * backoff_multiplier^retry`, capped at `max_delay`.
  pub fn delay_for_attempt(&self, retry: u32) -> Duration {
    let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
    let delay_secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
    let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());
    Duration::from_secs_f64(capped_secs)
  }

  /// Wait before retry number `retry`, never shorter than GitHub's
  /// `retry_after` hint. `None` when the hint exceeds `max_delay`.
  pub fn wait_before_retry(&self, retry: u32, retry_after: Option<Duration>) -> Option<Duration> {
    let backoff = self.delay_for_attempt(retry);
    match retry_after {
      Some(hint) if hint > self.max_delay => None,
      Some(hint) => Some(hint.max(backoff)),
      None => Some(backoff),
    }
  }
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_delay_grows_exponentially_and_caps() {
    let config = RetryConfig::new(5, Duration::from_secs(1), Duration::from_secs(5));

    assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
    assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
    assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
    assert_eq!(config.delay_for_attempt(3), Duration::from_secs(5));
    assert_eq!(config.delay_for_attempt(10), Duration::from_secs(5));
  }

  #[test]
  fn test_retry_after_hint_wins_when_longer() {
    let config = RetryConfig::DEFAULT;

    assert_eq!(
      config.wait_before_retry(0, Some(Duration::from_secs(7))),
      Some(Duration::from_secs(7))
    );
    assert_eq!(
      config.wait_before_retry(1, Some(Duration::from_millis(10))),
      Some(Duration::from_secs(2))
    );
    assert_eq!(config.wait_before_retry(0, None), Some(Duration::from_secs(1)));
    assert_eq!(
      config.wait_before_retry(0, Some(Duration::from_secs(30))),
      Some(Duration::from_secs(30))
    );
  }

  #[test]
  fn test_hint_beyond_cap_is_not_waited_for() {
    let config = RetryConfig::DEFAULT;

    assert_eq!(config.wait_before_retry(0, Some(Duration::from_secs(3600))), None);
    assert_eq!(config.wait_before_retry(2, Some(Duration::from_secs(31))), None);
  }

  #[test]
  fn test_from_settings() {
    let config = RetryConfig::from_settings(&RetrySettings {
      max_attempts: 0,
      initial_delay_ms: 250,
      max_delay_ms: 1000,
    });

    assert_eq!(config.max_attempts, 1);
    assert_eq!(config.initial_delay, Duration::from_millis(250));
    assert_eq!(config.max_delay, Duration::from_secs(1));
  }
}
