//! # Push Restriction Actors
//!
//! Identifiers for the users, teams and apps allowed to push to a restricted
//! branch. Written as `user:<login>`, `team:<slug>` or `app:<slug>`; a bare
//! identifier is a user login.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

static ACTOR_NAME_REGEX: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._\-\[\]]*$").expect("Failed to compile actor name regex"));

/// An actor allowed to push to a protected branch
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Actor {
  User(String),
  Team(String),
  App(String),
}

impl Actor {
  /// The login or slug without the kind prefix
  pub fn name(&self) -> &str {
    match self {
      Actor::User(name) | Actor::Team(name) | Actor::App(name) => name,
    }
  }
}

impl FromStr for Actor {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim();
    let (kind, name) = match trimmed.split_once(':') {
      Some((kind, name)) => (kind, name),
      None => ("user", trimmed),
    };

    if !ACTOR_NAME_REGEX.is_match(name) {
      return Err(ConfigError::InvalidSettings(format!("invalid push actor '{s}'")));
    }

    match kind {
      "user" => Ok(Actor::User(name.to_string())),
      "team" => Ok(Actor::Team(name.to_string())),
      "app" => Ok(Actor::App(name.to_string())),
      other => Err(ConfigError::InvalidSettings(format!(
        "invalid push actor '{s}': unknown kind '{other}' (expected user, team or app)"
      ))),
    }
  }
}

impl fmt::Display for Actor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Actor::User(name) => write!(f, "user:{name}"),
      Actor::Team(name) => write!(f, "team:{name}"),
      Actor::App(name) => write!(f, "app:{name}"),
    }
  }
}

impl Serialize for Actor {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for Actor {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_prefixed_actors() {
    assert_eq!("user:octocat".parse::<Actor>().unwrap(), Actor::User("octocat".to_string()));
    assert_eq!("team:release-managers".parse::<Actor>().unwrap(), Actor::Team("release-managers".to_string()));
    assert_eq!("app:dependabot".parse::<Actor>().unwrap(), Actor::App("dependabot".to_string()));
  }

  #[test]
  fn test_bare_identifier_is_a_user() {
    assert_eq!("hubot".parse::<Actor>().unwrap(), Actor::User("hubot".to_string()));
    assert_eq!("renovate[bot]".parse::<Actor>().unwrap(), Actor::User("renovate[bot]".to_string()));
  }

  #[test]
  fn test_reject_malformed_actors() {
    assert!("".parse::<Actor>().is_err());
    assert!("team:".parse::<Actor>().is_err());
    assert!("robot:r2d2".parse::<Actor>().is_err());
    assert!("user:has space".parse::<Actor>().is_err());
  }

  #[test]
  fn test_display_round_trips_through_serde() {
    let actor = Actor::Team("core".to_string());
    assert_eq!(actor.to_string(), "team:core");

    let json = serde_json::to_string(&actor).unwrap();
    assert_eq!(json, "\"team:core\"");
    let back: Actor = serde_json::from_str(&json).unwrap();
    assert_eq!(back, actor);
  }
}
