//! # Protection Presets
//!
//! Named bundles of branch protection settings and the validated
//! [`ProtectionPreset`] record every run works from. A preset can only be
//! obtained through [`load_preset`] or [`crate::settings::load_settings`], so
//! any value in hand already satisfies its invariants.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::error::ConfigError;
use crate::protection::{ProtectionState, PushRestrictions, ReviewRules, StatusChecks};

/// The built-in presets, ordered by increasing strictness
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
  /// One approving review, nothing else
  Minimal,
  /// Reviews with stale dismissal, up-to-date checks and resolved conversations
  Recommended,
  /// Everything in recommended plus code owners, admin enforcement and signed commits
  Strict,
}

impl PresetName {
  pub const ALL: [PresetName; 3] = [PresetName::Minimal, PresetName::Recommended, PresetName::Strict];

  pub const fn as_str(&self) -> &'static str {
    match self {
      PresetName::Minimal => "minimal",
      PresetName::Recommended => "recommended",
      PresetName::Strict => "strict",
    }
  }

  /// One-line description for listings
  pub const fn summary(&self) -> &'static str {
    match self {
      PresetName::Minimal => "1 approving review; no other restrictions",
      PresetName::Recommended => "1 review, dismiss stale reviews, strict status checks, resolved conversations",
      PresetName::Strict => "2 reviews, code owners, strict checks, admins enforced, signed commits",
    }
  }

  /// The settings bundled under this name
  pub fn preset(&self) -> ProtectionPreset {
    let base = ProtectionPreset::unprotected();
    match self {
      PresetName::Minimal => ProtectionPreset {
        required_reviewers: 1,
        ..base
      },
      PresetName::Recommended => ProtectionPreset {
        required_reviewers: 1,
        dismiss_stale: true,
        strict: true,
        require_conversation_resolution: true,
        ..base
      },
      PresetName::Strict => ProtectionPreset {
        required_reviewers: 2,
        dismiss_stale: true,
        require_codeowners: true,
        strict: true,
        require_conversation_resolution: true,
        enforce_admins: true,
        require_signed_commits: true,
        ..base
      },
    }
  }

  fn expected_names() -> String {
    Self::ALL.iter().map(PresetName::as_str).collect::<Vec<_>>().join(", ")
  }
}

impl fmt::Display for PresetName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PresetName {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim().to_ascii_lowercase();
    PresetName::ALL
      .into_iter()
      .find(|name| name.as_str() == wanted)
      .ok_or_else(|| ConfigError::InvalidPreset {
        name: s.to_string(),
        expected: PresetName::expected_names(),
      })
  }
}

/// Look up a built-in preset by name
pub fn load_preset(name: &str) -> Result<ProtectionPreset, ConfigError> {
  name.parse::<PresetName>().map(|preset| preset.preset())
}

/// A validated set of branch protection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectionPreset {
  pub(crate) required_reviewers: u8,
  pub(crate) dismiss_stale: bool,
  pub(crate) require_codeowners: bool,
  pub(crate) required_contexts: Vec<String>,
  pub(crate) strict: bool,
  pub(crate) require_conversation_resolution: bool,
  pub(crate) restrict_push_to: BTreeSet<Actor>,
  pub(crate) allow_deletions: bool,
  pub(crate) enforce_admins: bool,
  pub(crate) require_signed_commits: bool,
}

impl ProtectionPreset {
  /// Every protection switched off; the base for settings without `extends`
  pub(crate) const fn unprotected() -> Self {
    Self {
      required_reviewers: 0,
      dismiss_stale: false,
      require_codeowners: false,
      required_contexts: Vec::new(),
      strict: false,
      require_conversation_resolution: false,
      restrict_push_to: BTreeSet::new(),
      allow_deletions: false,
      enforce_admins: false,
      require_signed_commits: false,
    }
  }

  pub const fn required_reviewers(&self) -> u8 {
    self.required_reviewers
  }

  pub const fn dismiss_stale(&self) -> bool {
    self.dismiss_stale
  }

  pub const fn require_codeowners(&self) -> bool {
    self.require_codeowners
  }

  pub fn required_contexts(&self) -> &[String] {
    &self.required_contexts
  }

  pub const fn strict(&self) -> bool {
    self.strict
  }

  pub const fn require_conversation_resolution(&self) -> bool {
    self.require_conversation_resolution
  }

  pub const fn restrict_push_to(&self) -> &BTreeSet<Actor> {
    &self.restrict_push_to
  }

  pub const fn allow_deletions(&self) -> bool {
    self.allow_deletions
  }

  pub const fn enforce_admins(&self) -> bool {
    self.enforce_admins
  }

  pub const fn require_signed_commits(&self) -> bool {
    self.require_signed_commits
  }

  /// Desired required status checks
  pub fn status_checks(&self) -> StatusChecks {
    StatusChecks {
      strict: self.strict,
      contexts: self.required_contexts.clone(),
    }
  }

  /// Desired push restrictions, split by actor kind
  pub fn push_restrictions(&self) -> PushRestrictions {
    let mut restrictions = PushRestrictions::default();
    for actor in &self.restrict_push_to {
      let name = actor.name().to_string();
      match actor {
        Actor::User(_) => restrictions.users.insert(name),
        Actor::Team(_) => restrictions.teams.insert(name),
        Actor::App(_) => restrictions.apps.insert(name),
      };
    }
    restrictions
  }

  /// Desired review rules; `None` when pull request reviews are not required
  pub fn review_rules(&self) -> Option<ReviewRules> {
    if self.required_reviewers == 0 && !self.dismiss_stale && !self.require_codeowners {
      return None;
    }
    Some(ReviewRules {
      required_approving_review_count: self.required_reviewers,
      dismiss_stale_reviews: self.dismiss_stale,
      require_code_owner_reviews: self.require_codeowners,
    })
  }

  /// The full protection state this preset describes
  pub fn desired_state(&self) -> ProtectionState {
    let status_checks = self.status_checks();
    let restrictions = self.push_restrictions();
    ProtectionState {
      status_checks: (!status_checks.is_disabled()).then_some(status_checks),
      restrictions: (!restrictions.is_empty()).then_some(restrictions),
      allow_deletions: self.allow_deletions,
      enforce_admins: self.enforce_admins,
      pull_request_reviews: self.review_rules(),
      required_signatures: self.require_signed_commits,
      required_conversation_resolution: self.require_conversation_resolution,
      protected: true,
      unmanaged: Default::default(),
    }
  }
}
