//! # Wire Models
//!
//! Request and response bodies for the branch-protection endpoints, and their
//! conversion to and from [`fence_core::ProtectionState`].

use fence_core::{ProtectionState, PushRestrictions, ReviewRules, StatusChecks};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Keys of [`ProtectionState::unmanaged`] nesting settings that belong inside
/// a sub-resource object of the full write
const UNMANAGED_REVIEWS: &str = "required_pull_request_reviews";
const UNMANAGED_CHECKS: &str = "required_status_checks";

/// Represents GitHub authentication credentials
#[derive(Clone)]
pub struct GitHubAuth {
  pub token: String,
}

impl std::fmt::Debug for GitHubAuth {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GitHubAuth").field("token", &"<redacted>").finish()
  }
}

/// `GET /repos/{owner}/{repo}/branches/{branch}/protection`
#[derive(Debug, Default, Deserialize)]
pub struct BranchProtectionResponse {
  pub required_status_checks: Option<RequiredStatusChecksResponse>,
  pub enforce_admins: Option<EnabledFlag>,
  pub required_pull_request_reviews: Option<PullRequestReviewsResponse>,
  pub restrictions: Option<RestrictionsResponse>,
  pub required_signatures: Option<EnabledFlag>,
  pub allow_deletions: Option<EnabledFlag>,
  pub required_conversation_resolution: Option<EnabledFlag>,
  pub required_linear_history: Option<EnabledFlag>,
  pub allow_force_pushes: Option<EnabledFlag>,
  pub block_creations: Option<EnabledFlag>,
  pub lock_branch: Option<EnabledFlag>,
  pub allow_fork_syncing: Option<EnabledFlag>,
}

#[derive(Debug, Deserialize)]
pub struct RequiredStatusChecksResponse {
  #[serde(default)]
  pub strict: bool,
  #[serde(default)]
  pub contexts: Vec<String>,
  #[serde(default)]
  pub checks: Vec<CheckRef>,
}

/// A required check, optionally pinned to the GitHub App that must report it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRef {
  pub context: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub app_id: Option<i64>,
}

/// The `{"enabled": bool}` wrapper GitHub uses for toggles
#[derive(Debug, Deserialize)]
pub struct EnabledFlag {
  pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestReviewsResponse {
  #[serde(default)]
  pub dismiss_stale_reviews: bool,
  #[serde(default)]
  pub require_code_owner_reviews: bool,
  #[serde(default)]
  pub required_approving_review_count: u8,
  #[serde(default)]
  pub require_last_push_approval: bool,
  pub dismissal_restrictions: Option<RestrictionsResponse>,
  pub bypass_pull_request_allowances: Option<RestrictionsResponse>,
}

#[derive(Debug, Deserialize)]
pub struct RestrictionsResponse {
  #[serde(default)]
  pub users: Vec<LoginRef>,
  #[serde(default)]
  pub teams: Vec<SlugRef>,
  #[serde(default)]
  pub apps: Vec<SlugRef>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRef {
  pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct SlugRef {
  pub slug: String,
}

impl RestrictionsResponse {
  /// The `{users, teams, apps}` name lists a write expects
  fn to_write_form(&self) -> Value {
    json!({
      "users": self.users.iter().map(|u| u.login.as_str()).collect::<Vec<_>>(),
      "teams": self.teams.iter().map(|t| t.slug.as_str()).collect::<Vec<_>>(),
      "apps": self.apps.iter().map(|a| a.slug.as_str()).collect::<Vec<_>>(),
    })
  }
}

impl BranchProtectionResponse {
  /// Everything fence reads but does not manage, in the shape of a full write
  fn unmanaged(&self) -> Map<String, Value> {
    let mut unmanaged = Map::new();

    for (key, flag) in [
      ("required_linear_history", &self.required_linear_history),
      ("allow_force_pushes", &self.allow_force_pushes),
      ("block_creations", &self.block_creations),
      ("lock_branch", &self.lock_branch),
      ("allow_fork_syncing", &self.allow_fork_syncing),
    ] {
      if let Some(flag) = flag {
        unmanaged.insert(key.to_string(), Value::Bool(flag.enabled));
      }
    }

    if let Some(reviews) = &self.required_pull_request_reviews {
      let mut extra = Map::new();
      extra.insert(
        "require_last_push_approval".to_string(),
        Value::Bool(reviews.require_last_push_approval),
      );
      if let Some(dismissal) = &reviews.dismissal_restrictions {
        extra.insert("dismissal_restrictions".to_string(), dismissal.to_write_form());
      }
      if let Some(bypass) = &reviews.bypass_pull_request_allowances {
        extra.insert("bypass_pull_request_allowances".to_string(), bypass.to_write_form());
      }
      unmanaged.insert(UNMANAGED_REVIEWS.to_string(), Value::Object(extra));
    }

    if let Some(checks) = &self.required_status_checks {
      let pinned: Vec<&CheckRef> = checks.checks.iter().filter(|check| check.app_id.is_some()).collect();
      if !pinned.is_empty() {
        unmanaged.insert(UNMANAGED_CHECKS.to_string(), json!({ "checks": pinned }));
      }
    }

    unmanaged
  }
}

impl From<BranchProtectionResponse> for ProtectionState {
  fn from(response: BranchProtectionResponse) -> Self {
    let enabled = |flag: Option<EnabledFlag>| flag.is_some_and(|f| f.enabled);
    let unmanaged = response.unmanaged();

    ProtectionState {
      status_checks: response.required_status_checks.map(|checks| StatusChecks {
        strict: checks.strict,
        contexts: checks.contexts,
      }),
      restrictions: response.restrictions.map(|r| PushRestrictions {
        users: r.users.into_iter().map(|u| u.login).collect(),
        teams: r.teams.into_iter().map(|t| t.slug).collect(),
        apps: r.apps.into_iter().map(|a| a.slug).collect(),
      }),
      allow_deletions: enabled(response.allow_deletions),
      enforce_admins: enabled(response.enforce_admins),
      pull_request_reviews: response.required_pull_request_reviews.map(|r| ReviewRules {
        required_approving_review_count: r.required_approving_review_count,
        dismiss_stale_reviews: r.dismiss_stale_reviews,
        require_code_owner_reviews: r.require_code_owner_reviews,
      }),
      required_signatures: enabled(response.required_signatures),
      required_conversation_resolution: enabled(response.required_conversation_resolution),
      protected: true,
      unmanaged,
    }
  }
}

/// `PATCH …/protection/required_status_checks`
#[derive(Debug, Serialize)]
pub struct StatusChecksRequest<'a> {
  pub strict: bool,
  pub contexts: &'a [String],
}

/// `PATCH …/protection/required_pull_request_reviews`
#[derive(Debug, Serialize)]
pub struct ReviewsRequest {
  pub dismiss_stale_reviews: bool,
  pub require_code_owner_reviews: bool,
  pub required_approving_review_count: u8,
  /// Unmanaged review settings, only filled for a full write
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl From<&ReviewRules> for ReviewsRequest {
  fn from(rules: &ReviewRules) -> Self {
    Self {
      dismiss_stale_reviews: rules.dismiss_stale_reviews,
      require_code_owner_reviews: rules.require_code_owner_reviews,
      required_approving_review_count: rules.required_approving_review_count,
      extra: Map::new(),
    }
  }
}

/// `PUT …/protection`; GitHub requires every top-level key, nullable or not.
/// Unmanaged settings read earlier ride along in `extra`.
#[derive(Debug, Serialize)]
pub struct UpdateProtectionRequest {
  pub required_status_checks: Option<UpdateStatusChecks>,
  pub enforce_admins: bool,
  pub required_pull_request_reviews: Option<ReviewsRequest>,
  pub restrictions: Option<UpdateRestrictions>,
  pub allow_deletions: bool,
  pub required_conversation_resolution: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Status checks as `checks`, which keeps the app each context is pinned to
#[derive(Debug, Serialize)]
pub struct UpdateStatusChecks {
  pub strict: bool,
  pub checks: Vec<CheckRef>,
}

#[derive(Debug, Serialize)]
pub struct UpdateRestrictions {
  pub users: Vec<String>,
  pub teams: Vec<String>,
  pub apps: Vec<String>,
}

fn take_object(map: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
  match map.remove(key) {
    Some(Value::Object(object)) => object,
    _ => Map::new(),
  }
}

impl From<&ProtectionState> for UpdateProtectionRequest {
  fn from(state: &ProtectionState) -> Self {
    let mut extra = state.unmanaged.clone();
    let review_extra = take_object(&mut extra, UNMANAGED_REVIEWS);
    let pinned: Vec<CheckRef> = take_object(&mut extra, UNMANAGED_CHECKS)
      .remove("checks")
      .and_then(|checks| serde_json::from_value(checks).ok())
      .unwrap_or_default();

    Self {
      required_status_checks: state.status_checks.as_ref().map(|checks| UpdateStatusChecks {
        strict: checks.strict,
        checks: checks
          .contexts
          .iter()
          .map(|context| CheckRef {
            context: context.clone(),
            app_id: pinned
              .iter()
              .find(|check| &check.context == context)
              .and_then(|check| check.app_id),
          })
          .collect(),
      }),
      enforce_admins: state.enforce_admins,
      required_pull_request_reviews: state.pull_request_reviews.as_ref().map(|rules| ReviewsRequest {
        extra: review_extra,
        ..ReviewsRequest::from(rules)
      }),
      restrictions: state.restrictions.as_ref().map(|r| UpdateRestrictions {
        users: r.users.iter().cloned().collect(),
        teams: r.teams.iter().cloned().collect(),
        apps: r.apps.iter().cloned().collect(),
      }),
      allow_deletions: state.allow_deletions,
      required_conversation_resolution: state.required_conversation_resolution,
      extra,
    }
  }
}
