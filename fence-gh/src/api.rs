//! # Protection API Seam
//!
//! The operations the applier needs from GitHub, as a trait so runs can be
//! driven against an in-memory fake in tests.

use std::future::Future;

use fence_core::{BranchTarget, ProtectionState, ReviewRules};

use crate::client::GitHubClient;
use crate::error::ProtectionError;

/// Read and overwrite branch-protection sub-resources.
///
/// Each write replaces its sub-resource wholesale, so repeating a call with
/// the same arguments leaves the remote unchanged. Sub-resource writes need an
/// already protected branch and, for status checks, push restrictions and
/// reviews, an enabled sub-resource; `replace_protection` has no such
/// precondition. Implementations must not retry internally.
pub trait ProtectionApi: Send + Sync {
  fn get_protection(&self, target: &BranchTarget)
  -> impl Future<Output = Result<ProtectionState, ProtectionError>> + Send;

  fn set_required_status_checks(
    &self,
    target: &BranchTarget,
    strict: bool,
    contexts: &[String],
  ) -> impl Future<Output = Result<(), ProtectionError>> + Send;

  fn set_push_restrictions(
    &self,
    target: &BranchTarget,
    users: &[String],
    teams: &[String],
    apps: &[String],
  ) -> impl Future<Output = Result<(), ProtectionError>> + Send;

  fn set_allow_deletions(
    &self,
    target: &BranchTarget,
    allowed: bool,
  ) -> impl Future<Output = Result<(), ProtectionError>> + Send;

  fn set_enforce_admins(
    &self,
    target: &BranchTarget,
    enabled: bool,
  ) -> impl Future<Output = Result<(), ProtectionError>> + Send;

  fn set_pull_request_reviews(
    &self,
    target: &BranchTarget,
    rules: Option<&ReviewRules>,
  ) -> impl Future<Output = Result<(), ProtectionError>> + Send;

  fn set_required_signatures(
    &self,
    target: &BranchTarget,
    enabled: bool,
  ) -> impl Future<Output = Result<(), ProtectionError>> + Send;

  /// Rewrite the whole protection, creating it on an unprotected branch.
  /// Required signatures are left alone.
  fn replace_protection(
    &self,
    target: &BranchTarget,
    state: &ProtectionState,
  ) -> impl Future<Output = Result<(), ProtectionError>> + Send;
}

impl ProtectionApi for GitHubClient {
  async fn get_protection(&self, target: &BranchTarget) -> Result<ProtectionState, ProtectionError> {
    GitHubClient::get_protection(self, target).await
  }

  async fn set_required_status_checks(
    &self,
    target: &BranchTarget,
    strict: bool,
    contexts: &[String],
  ) -> Result<(), ProtectionError> {
    GitHubClient::set_required_status_checks(self, target, strict, contexts).await
  }

  async fn set_push_restrictions(
    &self,
    target: &BranchTarget,
    users: &[String],
    teams: &[String],
    apps: &[String],
  ) -> Result<(), ProtectionError> {
    GitHubClient::set_push_restrictions(self, target, users, teams, apps).await
  }

  async fn set_allow_deletions(&self, target: &BranchTarget, allowed: bool) -> Result<(), ProtectionError> {
    GitHubClient::set_allow_deletions(self, target, allowed).await
  }

  async fn set_enforce_admins(&self, target: &BranchTarget, enabled: bool) -> Result<(), ProtectionError> {
    GitHubClient::set_enforce_admins(self, target, enabled).await
  }

  async fn set_pull_request_reviews(
    &self,
    target: &BranchTarget,
    rules: Option<&ReviewRules>,
  ) -> Result<(), ProtectionError> {
    GitHubClient::set_pull_request_reviews(self, target, rules).await
  }

  async fn set_required_signatures(&self, target: &BranchTarget, enabled: bool) -> Result<(), ProtectionError> {
    GitHubClient::set_required_signatures(self, target, enabled).await
  }

  async fn replace_protection(&self, target: &BranchTarget, state: &ProtectionState) -> Result<(), ProtectionError> {
    GitHubClient::replace_protection(self, target, state).await
  }
}
