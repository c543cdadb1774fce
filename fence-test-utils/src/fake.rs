//! In-memory stand-in for the GitHub branch-protection API
//!
//! [`FakeProtectionApi`] holds a single branch's [`ProtectionState`], applies
//! writes to it the way GitHub would and records every call so tests can
//! assert on exactly what reached the "network".
//!
//! Like GitHub, an unprotected branch answers sub-resource writes with 404
//! until the first full rewrite, and a sub-resource that is not enabled
//! cannot be patched in place.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use fence_core::{BranchTarget, ProtectionState, PushRestrictions, ReviewRules, StatusChecks};
use fence_gh::{ProtectionApi, ProtectionError};

/// A recorded call and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
  GetProtection,
  SetRequiredStatusChecks {
    strict: bool,
    contexts: Vec<String>,
  },
  SetPushRestrictions {
    users: Vec<String>,
    teams: Vec<String>,
    apps: Vec<String>,
  },
  SetAllowDeletions(bool),
  SetEnforceAdmins(bool),
  SetPullRequestReviews(Option<ReviewRules>),
  SetRequiredSignatures(bool),
  ReplaceProtection(ProtectionState),
}

/// The operation a [`Call`] targets, used to script failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
  GetProtection,
  SetRequiredStatusChecks,
  SetPushRestrictions,
  SetAllowDeletions,
  SetEnforceAdmins,
  SetPullRequestReviews,
  SetRequiredSignatures,
  ReplaceProtection,
}

impl Call {
  pub const fn kind(&self) -> CallKind {
    match self {
      Call::GetProtection => CallKind::GetProtection,
      Call::SetRequiredStatusChecks { .. } => CallKind::SetRequiredStatusChecks,
      Call::SetPushRestrictions { .. } => CallKind::SetPushRestrictions,
      Call::SetAllowDeletions(_) => CallKind::SetAllowDeletions,
      Call::SetEnforceAdmins(_) => CallKind::SetEnforceAdmins,
      Call::SetPullRequestReviews(_) => CallKind::SetPullRequestReviews,
      Call::SetRequiredSignatures(_) => CallKind::SetRequiredSignatures,
      Call::ReplaceProtection(_) => CallKind::ReplaceProtection,
    }
  }

  pub const fn is_write(&self) -> bool {
    !matches!(self, Call::GetProtection)
  }
}

type CallHook = Box<dyn Fn(&Call) + Send + Sync>;

#[derive(Default)]
struct Inner {
  state: ProtectionState,
  calls: Vec<Call>,
  scripted: HashMap<CallKind, VecDeque<ProtectionError>>,
  always: HashMap<CallKind, ProtectionError>,
  ignored: HashSet<CallKind>,
}

/// Scriptable fake implementing [`ProtectionApi`]
#[derive(Default)]
pub struct FakeProtectionApi {
  inner: Mutex<Inner>,
  hook: Option<CallHook>,
}

impl FakeProtectionApi {
  /// A branch with no protection configured; only
  /// [`ProtectionApi::replace_protection`] can write to it
  pub fn new() -> Self {
    Self::default()
  }

  /// A branch whose remote state starts as `state`
  pub fn with_state(state: ProtectionState) -> Self {
    let fake = Self::default();
    fake.lock().state = state;
    fake
  }

  /// Run `hook` on every call after it is recorded
  pub fn on_call(mut self, hook: impl Fn(&Call) + Send + Sync + 'static) -> Self {
    self.hook = Some(Box::new(hook));
    self
  }

  /// Fail the next call of `kind` with `error`; queued errors are used in order
  pub fn fail_next(&self, kind: CallKind, error: ProtectionError) {
    self.lock().scripted.entry(kind).or_default().push_back(error);
  }

  /// Fail every call of `kind` with `error`
  pub fn fail_always(&self, kind: CallKind, error: ProtectionError) {
    self.lock().always.insert(kind, error);
  }

  /// Accept writes of `kind` without changing the remote state
  pub fn ignore_writes(&self, kind: CallKind) {
    self.lock().ignored.insert(kind);
  }

  /// Replace the remote state, as if someone edited it out of band
  pub fn set_state(&self, state: ProtectionState) {
    self.lock().state = state;
  }

  pub fn state(&self) -> ProtectionState {
    self.lock().state.clone()
  }

  pub fn calls(&self) -> Vec<Call> {
    self.lock().calls.clone()
  }

  pub fn write_calls(&self) -> Vec<Call> {
    self.lock().calls.iter().filter(|call| call.is_write()).cloned().collect()
  }

  pub fn call_count(&self) -> usize {
    self.lock().calls.len()
  }

  pub fn count_of(&self, kind: CallKind) -> usize {
    self.lock().calls.iter().filter(|call| call.kind() == kind).count()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Record `call`, then either fail it or apply `write` to the state.
  /// Ignored kinds skip `write` and its preconditions.
  fn handle(
    &self,
    call: Call,
    write: impl FnOnce(&mut ProtectionState) -> Result<(), ProtectionError>,
  ) -> Result<ProtectionState, ProtectionError> {
    let kind = call.kind();
    let result = {
      let mut inner = self.lock();
      inner.calls.push(call.clone());

      let scripted = inner.scripted.get_mut(&kind).and_then(VecDeque::pop_front);
      match scripted.or_else(|| inner.always.get(&kind).cloned()) {
        Some(error) => Err(error),
        None if call.is_write() && !inner.ignored.contains(&kind) => {
          write(&mut inner.state).map(|()| inner.state.clone())
        }
        None => Ok(inner.state.clone()),
      }
    };

    if let Some(hook) = &self.hook {
      hook(&call);
    }
    result
  }
}

fn not_found(message: &str) -> ProtectionError {
  ProtectionError::NotFound {
    message: message.to_string(),
  }
}

fn require_protected(state: &ProtectionState) -> Result<(), ProtectionError> {
  if state.protected {
    Ok(())
  } else {
    Err(not_found("Branch not protected"))
  }
}

impl ProtectionApi for FakeProtectionApi {
  async fn get_protection(&self, _target: &BranchTarget) -> Result<ProtectionState, ProtectionError> {
    self.handle(Call::GetProtection, |_| Ok(()))
  }

  async fn set_required_status_checks(
    &self,
    _target: &BranchTarget,
    strict: bool,
    contexts: &[String],
  ) -> Result<(), ProtectionError> {
    let call = Call::SetRequiredStatusChecks {
      strict,
      contexts: contexts.to_vec(),
    };
    self
      .handle(call, |state| {
        require_protected(state)?;
        if state.status_checks.is_none() {
          return Err(not_found("Required status checks not enabled"));
        }
        state.status_checks = Some(StatusChecks {
          strict,
          contexts: contexts.to_vec(),
        });
        Ok(())
      })
      .map(drop)
  }

  async fn set_push_restrictions(
    &self,
    _target: &BranchTarget,
    users: &[String],
    teams: &[String],
    apps: &[String],
  ) -> Result<(), ProtectionError> {
    let call = Call::SetPushRestrictions {
      users: users.to_vec(),
      teams: teams.to_vec(),
      apps: apps.to_vec(),
    };
    self
      .handle(call, |state| {
        require_protected(state)?;
        let restrictions = PushRestrictions {
          users: users.iter().cloned().collect(),
          teams: teams.iter().cloned().collect(),
          apps: apps.iter().cloned().collect(),
        };
        if state.restrictions.is_none() && !restrictions.is_empty() {
          return Err(not_found("Push restrictions not enabled"));
        }
        state.restrictions = (!restrictions.is_empty()).then_some(restrictions);
        Ok(())
      })
      .map(drop)
  }

  async fn set_allow_deletions(&self, _target: &BranchTarget, allowed: bool) -> Result<(), ProtectionError> {
    self
      .handle(Call::SetAllowDeletions(allowed), |state| {
        require_protected(state)?;
        state.allow_deletions = allowed;
        Ok(())
      })
      .map(drop)
  }

  async fn set_enforce_admins(&self, _target: &BranchTarget, enabled: bool) -> Result<(), ProtectionError> {
    self
      .handle(Call::SetEnforceAdmins(enabled), |state| {
        require_protected(state)?;
        state.enforce_admins = enabled;
        Ok(())
      })
      .map(drop)
  }

  async fn set_pull_request_reviews(
    &self,
    _target: &BranchTarget,
    rules: Option<&ReviewRules>,
  ) -> Result<(), ProtectionError> {
    self
      .handle(Call::SetPullRequestReviews(rules.cloned()), |state| {
        require_protected(state)?;
        if state.pull_request_reviews.is_none() && rules.is_some() {
          return Err(not_found("Required pull request reviews not enabled"));
        }
        state.pull_request_reviews = rules.cloned();
        Ok(())
      })
      .map(drop)
  }

  async fn set_required_signatures(&self, _target: &BranchTarget, enabled: bool) -> Result<(), ProtectionError> {
    self
      .handle(Call::SetRequiredSignatures(enabled), |state| {
        require_protected(state)?;
        state.required_signatures = enabled;
        Ok(())
      })
      .map(drop)
  }

  async fn replace_protection(&self, _target: &BranchTarget, next: &ProtectionState) -> Result<(), ProtectionError> {
    self
      .handle(Call::ReplaceProtection(next.clone()), |state| {
        *state = ProtectionState {
          protected: true,
          required_signatures: state.required_signatures,
          ..next.clone()
        };
        Ok(())
      })
      .map(drop)
  }
}
