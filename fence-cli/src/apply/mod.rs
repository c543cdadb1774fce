//! # Applier
//!
//! Drives one branch towards a validated preset, one sub-resource at a time.
//! Each step reads the current protection, leaves matching sub-resources
//! alone and overwrites the rest; a final verification read checks that every
//! managed field landed. Rate-limited steps are retried with backoff, any
//! other failure is recorded and the run moves on to the next step.

pub mod report;
pub mod retry;
pub mod step;

use std::sync::Arc;

use chrono::Utc;
use fence_core::{BranchTarget, ErrorKind, PresetSource, ProtectionPreset, ProtectionState};
use fence_gh::{ProtectionApi, ProtectionError};
pub use report::{ApplyResult, RunReport, RunState, StepError, StepStatus};
pub use retry::RetryConfig;
pub use step::{Step, SubState};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// What a successful attempt found or did
enum Outcome {
  Unchanged(SubState),
  Applied { prior: SubState, new: SubState },
  Drift { observed: SubState, fields: Vec<&'static str> },
}

impl Outcome {
  fn into_result(self, step: Step, attempts: u32) -> ApplyResult {
    match self {
      Outcome::Unchanged(current) => ApplyResult::unchanged(step, current, attempts),
      Outcome::Applied { prior, new } => ApplyResult::applied(step, prior, new, attempts),
      Outcome::Drift { observed, fields } => ApplyResult::failed(
        step,
        Some(observed),
        StepError::new(
          ErrorKind::Drift,
          format!("remote differs from the desired settings: {}", fields.join(", ")),
        ),
        attempts,
      ),
    }
  }
}

/// A failed attempt, with the sub-resource value if it was read
struct StepFailure {
  prior: Option<SubState>,
  error: ProtectionError,
}

/// Applies presets to branches through a [`ProtectionApi`]
pub struct Applier<C> {
  client: Arc<C>,
  retry: RetryConfig,
  dry_run: bool,
}

impl<C> Clone for Applier<C> {
  fn clone(&self) -> Self {
    Self {
      client: Arc::clone(&self.client),
      retry: self.retry,
      dry_run: self.dry_run,
    }
  }
}

impl<C: ProtectionApi + 'static> Applier<C> {
  pub fn new(client: Arc<C>) -> Self {
    Self {
      client,
      retry: RetryConfig::default(),
      dry_run: false,
    }
  }

  pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
    self.retry = retry;
    self
  }

  /// Compare only: steps that differ report `Applied` but nothing is written
  pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
    self.dry_run = dry_run;
    self
  }

  /// Validate `source` and apply it to `target`.
  ///
  /// Invalid settings abort the run before any call reaches the client.
  pub async fn run(&self, target: &BranchTarget, source: &PresetSource, cancel: &CancellationToken) -> RunReport {
    match source.load() {
      Ok(preset) => self.run_preset(target, &preset, cancel).await,
      Err(err) => {
        warn!("Aborting run for {target}: {err}");
        RunReport::aborted(target.clone(), StepError::from(&err), self.dry_run)
      }
    }
  }

  /// Apply an already validated preset to `target`
  #[instrument(skip_all, fields(target = %target, dry_run = self.dry_run))]
  pub async fn run_preset(
    &self,
    target: &BranchTarget,
    preset: &ProtectionPreset,
    cancel: &CancellationToken,
  ) -> RunReport {
    let started_at = Utc::now();
    let desired = preset.desired_state();
    let mut steps = Vec::with_capacity(Step::ALL.len());

    for step in Step::ALL {
      if cancel.is_cancelled() {
        steps.push(ApplyResult::cancelled(step, 0));
        continue;
      }
      steps.push(self.run_step(target, step, &desired, cancel).await);
    }

    let report = RunReport::from_steps(target.clone(), steps, self.dry_run, started_at);
    info!("Run for {target} finished: {}", report.state);
    report
  }

  /// Apply `source` to every target concurrently, one task per target.
  ///
  /// Reports come back in the order of `targets`. Validation happens once up
  /// front; on failure every target is reported `Aborted`.
  pub async fn run_all(
    &self,
    targets: &[BranchTarget],
    source: &PresetSource,
    cancel: &CancellationToken,
  ) -> Vec<RunReport> {
    let preset = match source.load() {
      Ok(preset) => Arc::new(preset),
      Err(err) => {
        warn!("Aborting {} run(s): {err}", targets.len());
        let reason = StepError::from(&err);
        return targets
          .iter()
          .map(|target| RunReport::aborted(target.clone(), reason.clone(), self.dry_run))
          .collect();
      }
    };

    let handles: Vec<_> = targets
      .iter()
      .map(|target| {
        let applier = self.clone();
        let preset = Arc::clone(&preset);
        let cancel = cancel.clone();
        let task_target = target.clone();
        let handle = tokio::spawn(async move { applier.run_preset(&task_target, &preset, &cancel).await });
        (target.clone(), handle)
      })
      .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for (target, handle) in handles {
      match handle.await {
        Ok(report) => reports.push(report),
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(_) => reports.push(RunReport::cancelled(target, self.dry_run)),
      }
    }
    reports
  }

  async fn run_step(
    &self,
    target: &BranchTarget,
    step: Step,
    desired: &ProtectionState,
    cancel: &CancellationToken,
  ) -> ApplyResult {
    let mut attempts = 0;

    loop {
      attempts += 1;
      match self.attempt(target, step, desired).await {
        Ok(outcome) => return outcome.into_result(step, attempts),
        Err(StepFailure { prior, error }) if error.is_retryable() && attempts < self.retry.max_attempts => {
          let Some(wait) = self.retry.wait_before_retry(attempts - 1, error.retry_after()) else {
            let hint = error.retry_after().unwrap_or_default();
            warn!("{step} on {target} rate limited for {hint:?}, longer than the retry cap");
            let message = format!(
              "GitHub asks to retry in {}s, beyond the {}s retry cap: {error}",
              hint.as_secs(),
              self.retry.max_delay.as_secs()
            );
            return ApplyResult::failed(step, prior, StepError::new(ErrorKind::RateLimited, message), attempts);
          };
          warn!(
            "{step} on {target} rate limited (attempt {attempts}/{}), retrying in {wait:?}",
            self.retry.max_attempts
          );

          tokio::select! {
            _ = cancel.cancelled() => return ApplyResult::cancelled(step, attempts),
            _ = tokio::time::sleep(wait) => {}
          }
        }
        Err(StepFailure { prior, error }) => {
          warn!("{step} on {target} failed after {attempts} attempt(s): {error}");
          return ApplyResult::failed(step, prior, StepError::from(&error), attempts);
        }
      }
    }
  }

  /// Read, compare and, if needed, write one sub-resource
  async fn attempt(&self, target: &BranchTarget, step: Step, desired: &ProtectionState) -> Result<Outcome, StepFailure> {
    let current = self
      .client
      .get_protection(target)
      .await
      .map_err(|error| StepFailure { prior: None, error })?;
    let prior = step.sub_state(&current);

    if step == Step::Verify {
      let fields = desired.drift(&current);
      if fields.is_empty() || self.dry_run {
        return Ok(Outcome::Unchanged(prior));
      }
      return Ok(Outcome::Drift { observed: prior, fields });
    }

    let wanted = step.sub_state(desired);
    if wanted.matches(&prior) {
      debug!("{step} on {target} already matches");
      return Ok(Outcome::Unchanged(prior));
    }

    if self.dry_run {
      info!("{step} on {target} would change: {prior} -> {wanted}");
      return Ok(Outcome::Applied { prior, new: wanted });
    }

    match self.write(target, step, desired, &current).await {
      Ok(()) => {
        info!("{step} on {target}: {prior} -> {wanted}");
        Ok(Outcome::Applied { prior, new: wanted })
      }
      Err(error) => Err(StepFailure {
        prior: Some(prior),
        error,
      }),
    }
  }

  async fn write(
    &self,
    target: &BranchTarget,
    step: Step,
    desired: &ProtectionState,
    current: &ProtectionState,
  ) -> Result<(), ProtectionError> {
    if step == Step::Verify {
      return Ok(());
    }

    if step.needs_replace(current) {
      debug!("{step} on {target} rewrites the whole protection");
      self.client.replace_protection(target, &step.apply_to(current, desired)).await?;
      // The full rewrite only creates the protection; signatures are their own resource
      if step != Step::SignedCommits {
        return Ok(());
      }
    }

    match step {
      Step::StatusChecks => {
        let checks = desired.effective_status_checks();
        self
          .client
          .set_required_status_checks(target, checks.strict, &checks.contexts)
          .await
      }
      Step::PushRestrictions => {
        let restrictions = desired.effective_restrictions();
        let users: Vec<String> = restrictions.users.into_iter().collect();
        let teams: Vec<String> = restrictions.teams.into_iter().collect();
        let apps: Vec<String> = restrictions.apps.into_iter().collect();
        self.client.set_push_restrictions(target, &users, &teams, &apps).await
      }
      Step::AllowDeletions => self.client.set_allow_deletions(target, desired.allow_deletions).await,
      Step::EnforceAdmins => self.client.set_enforce_admins(target, desired.enforce_admins).await,
      Step::PullRequestReviews => {
        self
          .client
          .set_pull_request_reviews(target, desired.pull_request_reviews.as_ref())
          .await
      }
      Step::SignedCommits => self.client.set_required_signatures(target, desired.required_signatures).await,
      Step::ConversationResolution | Step::Verify => Ok(()),
    }
  }
}
