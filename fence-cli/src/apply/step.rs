//! Steps of an apply run and the sub-resource values they compare.

use std::fmt;

use fence_core::{ProtectionState, PushRestrictions, ReviewRules, StatusChecks};
use serde::Serialize;

/// One sub-resource comparison and write, or the final verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
  StatusChecks,
  PushRestrictions,
  AllowDeletions,
  EnforceAdmins,
  PullRequestReviews,
  SignedCommits,
  ConversationResolution,
  Verify,
}

impl Step {
  /// Execution order of a run
  pub const ALL: [Step; 8] = [
    Step::StatusChecks,
    Step::PushRestrictions,
    Step::AllowDeletions,
    Step::EnforceAdmins,
    Step::PullRequestReviews,
    Step::SignedCommits,
    Step::ConversationResolution,
    Step::Verify,
  ];

  pub const fn as_str(&self) -> &'static str {
    match self {
      Step::StatusChecks => "status_checks",
      Step::PushRestrictions => "push_restrictions",
      Step::AllowDeletions => "allow_deletions",
      Step::EnforceAdmins => "enforce_admins",
      Step::PullRequestReviews => "pull_request_reviews",
      Step::SignedCommits => "signed_commits",
      Step::ConversationResolution => "conversation_resolution",
      Step::Verify => "verify",
    }
  }

  /// Extract the value this step manages from a full protection state
  pub fn sub_state(&self, state: &ProtectionState) -> SubState {
    match self {
      Step::StatusChecks => SubState::StatusChecks(state.effective_status_checks()),
      Step::PushRestrictions => SubState::PushRestrictions(state.effective_restrictions()),
      Step::AllowDeletions => SubState::Flag(state.allow_deletions),
      Step::EnforceAdmins => SubState::Flag(state.enforce_admins),
      Step::PullRequestReviews => SubState::Reviews(state.pull_request_reviews.clone()),
      Step::SignedCommits => SubState::Flag(state.required_signatures),
      Step::ConversationResolution => SubState::Flag(state.required_conversation_resolution),
      Step::Verify => SubState::Protection(Box::new(state.clone())),
    }
  }

  /// Whether this step's write has to rewrite the whole protection.
  ///
  /// Sub-resource endpoints 404 on an unprotected branch, and status checks,
  /// push restrictions and reviews can only be updated once enabled.
  /// Conversation resolution has no sub-resource at all.
  pub fn needs_replace(&self, current: &ProtectionState) -> bool {
    if !current.protected {
      return true;
    }
    match self {
      Step::StatusChecks => current.status_checks.is_none(),
      Step::PushRestrictions => current.restrictions.is_none(),
      Step::PullRequestReviews => current.pull_request_reviews.is_none(),
      Step::ConversationResolution => true,
      Step::AllowDeletions | Step::EnforceAdmins | Step::SignedCommits | Step::Verify => false,
    }
  }

  /// `current` with this step's sub-resource taken from `desired`
  pub fn apply_to(&self, current: &ProtectionState, desired: &ProtectionState) -> ProtectionState {
    let mut next = ProtectionState {
      protected: true,
      ..current.clone()
    };
    match self {
      Step::StatusChecks => next.status_checks = desired.status_checks.clone(),
      Step::PushRestrictions => next.restrictions = desired.restrictions.clone(),
      Step::AllowDeletions => next.allow_deletions = desired.allow_deletions,
      Step::EnforceAdmins => next.enforce_admins = desired.enforce_admins,
      Step::PullRequestReviews => next.pull_request_reviews = desired.pull_request_reviews.clone(),
      Step::SignedCommits => next.required_signatures = desired.required_signatures,
      Step::ConversationResolution => {
        next.required_conversation_resolution = desired.required_conversation_resolution;
      }
      Step::Verify => {}
    }
    next
  }
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The value of one sub-resource, before or after a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SubState {
  StatusChecks(StatusChecks),
  PushRestrictions(PushRestrictions),
  Flag(bool),
  Reviews(Option<ReviewRules>),
  Protection(Box<ProtectionState>),
}

impl SubState {
  /// Whether two values are the same setting on GitHub
  pub fn matches(&self, other: &SubState) -> bool {
    match (self, other) {
      (SubState::StatusChecks(a), SubState::StatusChecks(b)) => a.matches(b),
      (a, b) => a == b,
    }
  }
}

impl fmt::Display for SubState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SubState::StatusChecks(checks) => write!(f, "{checks}"),
      SubState::PushRestrictions(restrictions) => write!(f, "{restrictions}"),
      SubState::Flag(true) => f.write_str("on"),
      SubState::Flag(false) => f.write_str("off"),
      SubState::Reviews(Some(rules)) => write!(f, "{rules}"),
      SubState::Reviews(None) => f.write_str("not required"),
      SubState::Protection(state) => f.write_str(&summarize(state)),
    }
  }
}

/// Short description of the protections that are switched on
fn summarize(state: &ProtectionState) -> String {
  let mut parts = Vec::new();

  let checks = state.effective_status_checks();
  if !checks.is_disabled() {
    parts.push(format!("checks: {checks}"));
  }
  let restrictions = state.effective_restrictions();
  if !restrictions.is_empty() {
    parts.push(format!("push: {restrictions}"));
  }
  if let Some(rules) = &state.pull_request_reviews {
    parts.push(format!("reviews: {rules}"));
  }
  for (enabled, label) in [
    (state.allow_deletions, "deletions allowed"),
    (state.enforce_admins, "admins enforced"),
    (state.required_signatures, "signed commits"),
    (state.required_conversation_resolution, "conversation resolution"),
  ] {
    if enabled {
      parts.push(label.to_string());
    }
  }

  if parts.is_empty() {
    "unprotected".to_string()
  } else {
    parts.join("; ")
  }
}
