//! # Branch Protection Endpoints
//!
//! One method per protection sub-resource, plus a full rewrite for branches
//! that are not protected yet and for settings without a sub-resource. Every
//! write is an idempotent overwrite; no method retries on its own.

use fence_core::{BranchTarget, ProtectionState, ReviewRules};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, instrument};

use crate::client::GitHubClient;
use crate::error::ProtectionError;
use crate::models::{BranchProtectionResponse, ReviewsRequest, StatusChecksRequest, UpdateProtectionRequest};

/// GitHub's 404 message for an existing branch without protection
const NOT_PROTECTED: &str = "Branch not protected";

impl GitHubClient {
  /// Read the full protection state of a branch.
  ///
  /// A branch without protection reads as the default, unprotected state; a
  /// missing branch or repository is still [`ProtectionError::NotFound`].
  #[instrument(skip(self), level = "debug")]
  pub async fn get_protection(&self, target: &BranchTarget) -> Result<ProtectionState, ProtectionError> {
    let url = self.protection_url(target, &[])?;
    let response = match self.send(self.request(Method::GET, url), "get protection").await {
      Ok(response) => response,
      Err(ProtectionError::NotFound { message }) if message.eq_ignore_ascii_case(NOT_PROTECTED) => {
        debug!("{target} is not protected");
        return Ok(ProtectionState::default());
      }
      Err(err) => return Err(err),
    };
    let protection: BranchProtectionResponse = Self::json(response, "branch protection").await?;
    Ok(protection.into())
  }

  /// Overwrite the required status checks
  #[instrument(skip(self), level = "debug")]
  pub async fn set_required_status_checks(
    &self,
    target: &BranchTarget,
    strict: bool,
    contexts: &[String],
  ) -> Result<(), ProtectionError> {
    let url = self.protection_url(target, &["required_status_checks"])?;
    let body = StatusChecksRequest { strict, contexts };
    self
      .send(self.request(Method::PATCH, url).json(&body), "set required status checks")
      .await?;
    Ok(())
  }

  /// Overwrite the actors allowed to push.
  ///
  /// GitHub splits restrictions by actor kind, so a non-empty overwrite is one
  /// replace per kind; an empty one removes the restriction entirely.
  #[instrument(skip(self), level = "debug")]
  pub async fn set_push_restrictions(
    &self,
    target: &BranchTarget,
    users: &[String],
    teams: &[String],
    apps: &[String],
  ) -> Result<(), ProtectionError> {
    if users.is_empty() && teams.is_empty() && apps.is_empty() {
      let url = self.protection_url(target, &["restrictions"])?;
      self.send(self.request(Method::DELETE, url), "remove push restrictions").await?;
      return Ok(());
    }

    for (kind, actors) in [("users", users), ("teams", teams), ("apps", apps)] {
      let url = self.protection_url(target, &["restrictions", kind])?;
      let body = json!({ kind: actors });
      self
        .send(self.request(Method::PUT, url).json(&body), "set push restrictions")
        .await?;
    }
    Ok(())
  }

  /// Grant (`POST`) or revoke (`DELETE`) branch deletion
  #[instrument(skip(self), level = "debug")]
  pub async fn set_allow_deletions(&self, target: &BranchTarget, allowed: bool) -> Result<(), ProtectionError> {
    self.toggle(target, "allow_deletions", allowed).await
  }

  /// Enable or disable enforcement of protection for administrators
  #[instrument(skip(self), level = "debug")]
  pub async fn set_enforce_admins(&self, target: &BranchTarget, enabled: bool) -> Result<(), ProtectionError> {
    self.toggle(target, "enforce_admins", enabled).await
  }

  /// Require or stop requiring signed commits
  #[instrument(skip(self), level = "debug")]
  pub async fn set_required_signatures(&self, target: &BranchTarget, enabled: bool) -> Result<(), ProtectionError> {
    self.toggle(target, "required_signatures", enabled).await
  }

  /// Overwrite pull request review requirements; `None` removes them
  #[instrument(skip(self), level = "debug")]
  pub async fn set_pull_request_reviews(
    &self,
    target: &BranchTarget,
    rules: Option<&ReviewRules>,
  ) -> Result<(), ProtectionError> {
    let url = self.protection_url(target, &["required_pull_request_reviews"])?;
    let request = match rules {
      Some(rules) => self.request(Method::PATCH, url).json(&ReviewsRequest::from(rules)),
      None => self.request(Method::DELETE, url),
    };
    self.send(request, "set pull request reviews").await?;
    Ok(())
  }

  /// Rewrite the whole protection with `PUT …/protection`, creating it if
  /// the branch is not protected yet. Signed commits are not part of this
  /// resource and stay as they are.
  #[instrument(skip(self, state), level = "debug")]
  pub async fn replace_protection(
    &self,
    target: &BranchTarget,
    state: &ProtectionState,
  ) -> Result<(), ProtectionError> {
    let url = self.protection_url(target, &[])?;
    let body = UpdateProtectionRequest::from(state);
    self
      .send(self.request(Method::PUT, url).json(&body), "replace protection")
      .await?;
    Ok(())
  }

  async fn toggle(&self, target: &BranchTarget, resource: &str, enabled: bool) -> Result<(), ProtectionError> {
    let url = self.protection_url(target, &[resource])?;
    let method = if enabled { Method::POST } else { Method::DELETE };
    self.send(self.request(method, url), resource).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use fence_core::{BranchTarget, ErrorKind, ProtectionState, PushRestrictions, ReviewRules, StatusChecks};
  use wiremock::matchers::{body_json, header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use crate::client::{GitHubClient, create_github_client};
  use crate::error::ProtectionError;

  const PROTECTION: &str = "/repos/owner/repo/branches/main/protection";

  async fn setup() -> (MockServer, GitHubClient, BranchTarget) {
    let mock_server = MockServer::start().await;
    let mut client = create_github_client("test_token");
    client.base_url = mock_server.uri();
    let target = BranchTarget::new("owner", "repo", "main").unwrap();
    (mock_server, client, target)
  }

  #[tokio::test]
  async fn test_get_protection() -> anyhow::Result<()> {
    let (mock_server, client, target) = setup().await;

    Mock::given(method("GET"))
      .and(path(PROTECTION))
      .and(header("Authorization", "Bearer test_token"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
          "required_status_checks": {"strict": true, "contexts": ["ci/build"]},
          "required_pull_request_reviews": {
              "dismiss_stale_reviews": true,
              "require_code_owner_reviews": false,
              "required_approving_review_count": 1
          },
          "enforce_admins": {"enabled": true},
          "required_signatures": {"enabled": false},
          "allow_deletions": {"enabled": false},
          "required_conversation_resolution": {"enabled": true}
      })))
      .expect(1)
      .mount(&mock_server)
      .await;

    let state = client.get_protection(&target).await?;
    assert_eq!(
      state.status_checks,
      Some(StatusChecks {
        strict: true,
        contexts: vec!["ci/build".to_string()]
      })
    );
    assert_eq!(state.pull_request_reviews.map(|r| r.required_approving_review_count), Some(1));
    assert!(state.enforce_admins);
    assert!(state.required_conversation_resolution);
    assert!(state.restrictions.is_none());

    Ok(())
  }

  #[tokio::test]
  async fn test_get_protection_of_unprotected_branch() -> anyhow::Result<()> {
    let (mock_server, client, target) = setup().await;

    Mock::given(method("GET"))
      .and(path(PROTECTION))
      .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
          "message": "Branch not protected",
          "documentation_url": "https://docs.github.com/rest/branches/branch-protection#get-branch-protection"
      })))
      .expect(1)
      .mount(&mock_server)
      .await;

    let state = client.get_protection(&target).await?;
    assert_eq!(state, ProtectionState::default());
    assert!(!state.protected);

    Ok(())
  }

  #[tokio::test]
  async fn test_get_protection_missing_branch() -> anyhow::Result<()> {
    let (mock_server, client, target) = setup().await;

    Mock::given(method("GET"))
      .and(path(PROTECTION))
      .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
          "message": "Branch not found"
      })))
      .mount(&mock_server)
      .await;

    let err = client.get_protection(&target).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("Branch not found"));

    Ok(())
  }

  #[tokio::test]
  async fn test_get_protection_malformed_body() -> anyhow::Result<()> {
    let (mock_server, client, target) = setup().await;

    Mock::given(method("GET"))
      .and(path(PROTECTION))
      .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
      .mount(&mock_server)
      .await;

    let err = client.get_protection(&target).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteError);

    Ok(())
  }

  #[tokio::test]
  async fn test_set_required_status_checks() -> anyhow::Result<()> {
    let (mock_server, client, target) = setup().await;

    Mock::given(method("PATCH"))
      .and(path(format!("{PROTECTION}/required_status_checks")))
      .and(body_json(serde_json::json!({"strict": true, "contexts": ["ci/build", "ci/lint"]})))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
      .expect(1)
      .mount(&mock_server)
      .await;

    let contexts = vec!["ci/build".to_string(), "ci/lint".to_string()];
    client.set_required_status_checks(&target, true, &contexts).await?;

    Ok(())
  }

  #[tokio::test]
  async fn test_set_push_restrictions_replaces_each_kind() -> anyhow::Result<()> {
    let (mock_server, client, target) = setup().await;

    Mock::given(method("PUT"))
      .and(path(format!("{PROTECTION}/restrictions/users")))
      .and(body_json(serde_json::json!({"users": ["octocat"]})))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("PUT"))
      .and(path(format!("{PROTECTION}/restrictions/teams")))
      .and(body_json(serde_json::json!({"teams": ["core"]})))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("PUT"))
      .and(path(format!("{PROTECTION}/restrictions/apps")))
      .and(body_json(serde_json::json!({"apps": []})))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
      .expect(1)
      .mount(&mock_server)
      .await;

    client
      .set_push_restrictions(&target, &["octocat".to_string()], &["core".to_string()], &[])
      .await?;

    Ok(())
  }

  #[tokio::test]
  async fn test_set_push_restrictions_empty_removes() -> anyhow::Result<()> {
    let (mock_server, client, target) = setup().await;

    Mock::given(method("DELETE"))
      .and(path(format!("{PROTECTION}/restrictions")))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&mock_server)
      .await;

    client.set_push_restrictions(&target, &[], &[], &[]).await?;

    Ok(())
  }

  #[tokio::test]
  async fn test_toggles_use_post_and_delete() -> anyhow::Result<()> {
    let (mock_server, client, target) = setup().await;

    Mock::given(method("POST"))
      .and(path(format!("{PROTECTION}/enforce_admins")))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"enabled": true})))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("DELETE"))
      .and(path(format!("{PROTECTION}/required_signatures")))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("DELETE"))
      .and(path(format!("{PROTECTION}/allow_deletions")))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&mock_server)
      .await;

    client.set_enforce_admins(&target, true).await?;
    client.set_required_signatures(&target, false).await?;
    client.set_allow_deletions(&target, false).await?;

    Ok(())
  }

  #[tokio::test]
  async fn test_set_pull_request_reviews() -> anyhow::Result<()> {
    let (mock_server, client, target) = setup().await;

    Mock::given(method("PATCH"))
      .and(path(format!("{PROTECTION}/required_pull_request_reviews")))
      .and(body_json(serde_json::json!({
          "dismiss_stale_reviews": true,
          "require_code_owner_reviews": false,
          "required_approving_review_count": 2
      })))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("DELETE"))
      .and(path(format!("{PROTECTION}/required_pull_request_reviews")))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&mock_server)
      .await;

    let rules = ReviewRules {
      required_approving_review_count: 2,
      dismiss_stale_reviews: true,
      require_code_owner_reviews: false,
    };
    client.set_pull_request_reviews(&target, Some(&rules)).await?;
    client.set_pull_request_reviews(&target, None).await?;

    Ok(())
  }

  #[tokio::test]
  async fn test_replace_protection_writes_full_state() -> anyhow::Result<()> {
    let (mock_server, client, target) = setup().await;

    Mock::given(method("PUT"))
      .and(path(PROTECTION))
      .and(body_json(serde_json::json!({
          "required_status_checks": {"strict": false, "checks": [{"context": "ci"}]},
          "enforce_admins": true,
          "required_pull_request_reviews": null,
          "restrictions": {"users": [], "teams": ["core"], "apps": []},
          "allow_deletions": false,
          "required_conversation_resolution": true
      })))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
      .expect(1)
      .mount(&mock_server)
      .await;

    let state = ProtectionState {
      status_checks: Some(StatusChecks {
        strict: false,
        contexts: vec!["ci".to_string()],
      }),
      restrictions: Some(PushRestrictions {
        teams: ["core".to_string()].into(),
        ..Default::default()
      }),
      enforce_admins: true,
      required_conversation_resolution: true,
      protected: true,
      ..Default::default()
    };
    client.replace_protection(&target, &state).await?;

    Ok(())
  }

  #[tokio::test]
  async fn test_replace_protection_keeps_unmanaged_settings() -> anyhow::Result<()> {
    let (mock_server, client, target) = setup().await;

    Mock::given(method("GET"))
      .and(path(PROTECTION))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
          "required_pull_request_reviews": {
              "dismiss_stale_reviews": true,
              "require_code_owner_reviews": false,
              "required_approving_review_count": 1,
              "require_last_push_approval": true
          },
          "enforce_admins": {"enabled": false},
          "required_linear_history": {"enabled": true},
          "allow_force_pushes": {"enabled": false},
          "block_creations": {"enabled": true},
          "required_conversation_resolution": {"enabled": false}
      })))
      .mount(&mock_server)
      .await;
    Mock::given(method("PUT"))
      .and(path(PROTECTION))
      .and(body_json(serde_json::json!({
          "required_status_checks": null,
          "enforce_admins": false,
          "required_pull_request_reviews": {
              "dismiss_stale_reviews": true,
              "require_code_owner_reviews": false,
              "required_approving_review_count": 1,
              "require_last_push_approval": true
          },
          "restrictions": null,
          "allow_deletions": false,
          "required_conversation_resolution": true,
          "required_linear_history": true,
          "allow_force_pushes": false,
          "block_creations": true
      })))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
      .expect(1)
      .mount(&mock_server)
      .await;

    let current = client.get_protection(&target).await?;
    let next = ProtectionState {
      required_conversation_resolution: true,
      ..current
    };
    client.replace_protection(&target, &next).await?;

    Ok(())
  }

  #[tokio::test]
  async fn test_write_rate_limited() -> anyhow::Result<()> {
    let (mock_server, client, target) = setup().await;

    Mock::given(method("POST"))
      .and(path(format!("{PROTECTION}/enforce_admins")))
      .respond_with(
        ResponseTemplate::new(403)
          .insert_header("retry-after", "3")
          .set_body_json(serde_json::json!({"message": "You have exceeded a secondary rate limit."})),
      )
      .mount(&mock_server)
      .await;

    let err = client.set_enforce_admins(&target, true).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));

    Ok(())
  }

  #[tokio::test]
  async fn test_write_forbidden_is_auth_error() -> anyhow::Result<()> {
    let (mock_server, client, target) = setup().await;

    Mock::given(method("POST"))
      .and(path(format!("{PROTECTION}/required_signatures")))
      .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
          "message": "Resource not accessible by integration"
      })))
      .mount(&mock_server)
      .await;

    let err = client.set_required_signatures(&target, true).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthError);
    assert!(!err.is_retryable());

    Ok(())
  }

  #[tokio::test]
  async fn test_request_timeout() -> anyhow::Result<()> {
    let (mock_server, client, target) = setup().await;
    let client = client.with_timeout(Duration::from_millis(100));

    Mock::given(method("GET"))
      .and(path(PROTECTION))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(serde_json::json!({}))
          .set_delay(Duration::from_secs(2)),
      )
      .mount(&mock_server)
      .await;

    let err = client.get_protection(&target).await.unwrap_err();
    assert!(matches!(err, ProtectionError::Timeout { .. }));
    assert_eq!(err.kind(), ErrorKind::Timeout);

    Ok(())
  }
}
