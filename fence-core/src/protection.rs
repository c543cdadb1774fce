//! # Protection State
//!
//! Normalized view of a branch's protection settings. The GitHub client parses
//! API responses into these types and the applier compares them with the
//! values a preset asks for. An absent sub-resource is equivalent to its "off"
//! value, so an unprotected branch and a branch with everything disabled
//! compare equal.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Required status checks for a branch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChecks {
  /// Require branches to be up to date before merging
  pub strict: bool,
  /// Check contexts that must pass, in the order they were configured
  pub contexts: Vec<String>,
}

impl StatusChecks {
  /// True when no check is required and strict mode is off
  pub fn is_disabled(&self) -> bool {
    !self.strict && self.contexts.is_empty()
  }

  /// Compare ignoring context order, since GitHub does not preserve it
  pub fn matches(&self, other: &StatusChecks) -> bool {
    let ours: BTreeSet<&str> = self.contexts.iter().map(String::as_str).collect();
    let theirs: BTreeSet<&str> = other.contexts.iter().map(String::as_str).collect();
    self.strict == other.strict && ours == theirs
  }
}

impl fmt::Display for StatusChecks {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_disabled() {
      return f.write_str("off");
    }
    let mode = if self.strict { "strict" } else { "loose" };
    if self.contexts.is_empty() {
      write!(f, "{mode}, no contexts")
    } else {
      write!(f, "{mode}, contexts: {}", self.contexts.join(", "))
    }
  }
}

/// Actors allowed to push to a restricted branch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRestrictions {
  pub users: BTreeSet<String>,
  pub teams: BTreeSet<String>,
  pub apps: BTreeSet<String>,
}

impl PushRestrictions {
  /// True when pushes are not restricted
  pub fn is_empty(&self) -> bool {
    self.users.is_empty() && self.teams.is_empty() && self.apps.is_empty()
  }
}

impl fmt::Display for PushRestrictions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_empty() {
      return f.write_str("unrestricted");
    }
    let mut parts = Vec::new();
    for (label, set) in [("users", &self.users), ("teams", &self.teams), ("apps", &self.apps)] {
      if !set.is_empty() {
        parts.push(format!("{label}: {}", set.iter().cloned().collect::<Vec<_>>().join(", ")));
      }
    }
    f.write_str(&parts.join("; "))
  }
}

/// Pull request review requirements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRules {
  pub required_approving_review_count: u8,
  pub dismiss_stale_reviews: bool,
  pub require_code_owner_reviews: bool,
}

impl fmt::Display for ReviewRules {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} approval(s)", self.required_approving_review_count)?;
    if self.dismiss_stale_reviews {
      f.write_str(", dismiss stale")?;
    }
    if self.require_code_owner_reviews {
      f.write_str(", code owners")?;
    }
    Ok(())
  }
}

/// Full protection state of a branch as read from GitHub
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionState {
  pub status_checks: Option<StatusChecks>,
  pub restrictions: Option<PushRestrictions>,
  pub allow_deletions: bool,
  pub enforce_admins: bool,
  pub pull_request_reviews: Option<ReviewRules>,
  pub required_signatures: bool,
  pub required_conversation_resolution: bool,
  /// False when the branch has no protection resource at all. Sub-resource
  /// endpoints only exist once the branch is protected.
  #[serde(default)]
  pub protected: bool,
  /// Settings fence does not manage, kept as GitHub reported them so that a
  /// full rewrite of the protection sends them back unchanged
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub unmanaged: Map<String, Value>,
}

impl ProtectionState {
  /// Status checks, treating an absent sub-resource as disabled
  pub fn effective_status_checks(&self) -> StatusChecks {
    self.status_checks.clone().unwrap_or_default()
  }

  /// Push restrictions, treating an absent sub-resource as unrestricted
  pub fn effective_restrictions(&self) -> PushRestrictions {
    self.restrictions.clone().unwrap_or_default()
  }

  /// Names of the fields where `observed` differs from this desired state
  pub fn drift(&self, observed: &ProtectionState) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if !self.effective_status_checks().matches(&observed.effective_status_checks()) {
      fields.push("required_status_checks");
    }
    if self.effective_restrictions() != observed.effective_restrictions() {
      fields.push("restrictions");
    }
    if self.allow_deletions != observed.allow_deletions {
      fields.push("allow_deletions");
    }
    if self.enforce_admins != observed.enforce_admins {
      fields.push("enforce_admins");
    }
    if self.pull_request_reviews != observed.pull_request_reviews {
      fields.push("required_pull_request_reviews");
    }
    if self.required_signatures != observed.required_signatures {
      fields.push("required_signatures");
    }
    if self.required_conversation_resolution != observed.required_conversation_resolution {
      fields.push("required_conversation_resolution");
    }
    fields
  }
}
