//! # Run Reports
//!
//! Per-step outcomes of an apply run and the run's terminal state. Reports
//! are built once, rendered and then dropped.

use std::fmt;

use chrono::{DateTime, Utc};
use fence_core::{BranchTarget, ConfigError, ErrorKind};
use fence_gh::ProtectionError;
use serde::Serialize;

use super::step::{Step, SubState};
use crate::consts::{EXIT_ABORTED, EXIT_CANCELLED, EXIT_COMPLETED, EXIT_PARTIALLY_FAILED};

/// Outcome of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  Applied,
  Unchanged,
  Failed,
  Cancelled,
}

impl StepStatus {
  pub const fn as_str(&self) -> &'static str {
    match self {
      StepStatus::Applied => "applied",
      StepStatus::Unchanged => "unchanged",
      StepStatus::Failed => "failed",
      StepStatus::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for StepStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Error captured in a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepError {
  pub kind: ErrorKind,
  pub message: String,
}

impl StepError {
  pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
    }
  }
}

impl From<&ProtectionError> for StepError {
  fn from(err: &ProtectionError) -> Self {
    Self::new(err.kind(), err.to_string())
  }
}

impl From<&ConfigError> for StepError {
  fn from(err: &ConfigError) -> Self {
    Self::new(err.kind(), err.to_string())
  }
}

impl fmt::Display for StepError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.kind, self.message)
  }
}

/// Result of one step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyResult {
  pub resource: Step,
  pub prior_state: Option<SubState>,
  pub new_state: Option<SubState>,
  pub status: StepStatus,
  pub error: Option<StepError>,
  /// Attempts made for this step, retries included
  pub attempts: u32,
}

impl ApplyResult {
  pub fn unchanged(resource: Step, current: SubState, attempts: u32) -> Self {
    Self {
      resource,
      prior_state: Some(current.clone()),
      new_state: Some(current),
      status: StepStatus::Unchanged,
      error: None,
      attempts,
    }
  }

  pub const fn applied(resource: Step, prior: SubState, new: SubState, attempts: u32) -> Self {
    Self {
      resource,
      prior_state: Some(prior),
      new_state: Some(new),
      status: StepStatus::Applied,
      error: None,
      attempts,
    }
  }

  pub const fn failed(resource: Step, prior: Option<SubState>, error: StepError, attempts: u32) -> Self {
    Self {
      resource,
      prior_state: prior,
      new_state: None,
      status: StepStatus::Failed,
      error: Some(error),
      attempts,
    }
  }

  pub fn cancelled(resource: Step, attempts: u32) -> Self {
    Self {
      resource,
      prior_state: None,
      new_state: None,
      status: StepStatus::Cancelled,
      error: Some(StepError::new(ErrorKind::Cancelled, "run cancelled before this step finished")),
      attempts,
    }
  }
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
  Completed,
  PartiallyFailed,
  Aborted,
  Cancelled,
}

impl RunState {
  pub const fn as_str(&self) -> &'static str {
    match self {
      RunState::Completed => "completed",
      RunState::PartiallyFailed => "partially_failed",
      RunState::Aborted => "aborted",
      RunState::Cancelled => "cancelled",
    }
  }

  /// Process exit status for this state
  pub const fn exit_code(&self) -> u8 {
    match self {
      RunState::Completed => EXIT_COMPLETED,
      RunState::PartiallyFailed => EXIT_PARTIALLY_FAILED,
      RunState::Aborted => EXIT_ABORTED,
      RunState::Cancelled => EXIT_CANCELLED,
    }
  }

  /// Rank used to pick the overall state of a batch
  const fn severity(&self) -> u8 {
    match self {
      RunState::Completed => 0,
      RunState::Cancelled => 1,
      RunState::PartiallyFailed => 2,
      RunState::Aborted => 3,
    }
  }

  /// The worst state among `states`; `Completed` when empty
  pub fn worst(states: impl IntoIterator<Item = RunState>) -> RunState {
    states
      .into_iter()
      .max_by_key(RunState::severity)
      .unwrap_or(RunState::Completed)
  }
}

impl fmt::Display for RunState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Everything one run did to one branch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
  pub target: BranchTarget,
  pub state: RunState,
  pub dry_run: bool,
  pub steps: Vec<ApplyResult>,
  pub abort_reason: Option<StepError>,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

impl RunReport {
  /// Build a report from finished steps, deriving the terminal state
  pub fn from_steps(target: BranchTarget, steps: Vec<ApplyResult>, dry_run: bool, started_at: DateTime<Utc>) -> Self {
    let state = if steps.iter().any(|s| s.status == StepStatus::Cancelled) {
      RunState::Cancelled
    } else if steps.iter().any(|s| s.status == StepStatus::Failed) {
      RunState::PartiallyFailed
    } else {
      RunState::Completed
    };

    Self {
      target,
      state,
      dry_run,
      steps,
      abort_reason: None,
      started_at,
      finished_at: Utc::now(),
    }
  }

  /// A run stopped by pre-flight validation; no steps ran
  pub fn aborted(target: BranchTarget, reason: StepError, dry_run: bool) -> Self {
    let now = Utc::now();
    Self {
      target,
      state: RunState::Aborted,
      dry_run,
      steps: Vec::new(),
      abort_reason: Some(reason),
      started_at: now,
      finished_at: now,
    }
  }

  /// A run cancelled before its first step
  pub fn cancelled(target: BranchTarget, dry_run: bool) -> Self {
    let steps = Step::ALL.iter().map(|step| ApplyResult::cancelled(*step, 0)).collect();
    Self::from_steps(target, steps, dry_run, Utc::now())
  }

  pub fn step(&self, step: Step) -> Option<&ApplyResult> {
    self.steps.iter().find(|result| result.resource == step)
  }

  pub fn count(&self, status: StepStatus) -> usize {
    self.steps.iter().filter(|result| result.status == status).count()
  }
}
