//! # Branch Targets
//!
//! The remote branch a run configures. Parsed from `owner/repo:branch` or from
//! a GitHub URL such as `https://github.com/owner/repo/tree/main`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::error::ConfigError;

static SHORTHAND_REGEX: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^([A-Za-z0-9][A-Za-z0-9-]*)/([A-Za-z0-9_.-]+):(.+)$").expect("Failed to compile branch target regex")
});

static NAME_REGEX: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("Failed to compile repository name regex"));

/// A single branch in a single repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BranchTarget {
  owner: String,
  repo: String,
  branch: String,
}

impl BranchTarget {
  /// Create a target, validating each component
  pub fn new(owner: &str, repo: &str, branch: &str) -> Result<Self, ConfigError> {
    let display = format!("{owner}/{repo}:{branch}");
    let invalid = |reason: &str| ConfigError::InvalidTarget {
      input: display.clone(),
      reason: reason.to_string(),
    };

    if !NAME_REGEX.is_match(owner) {
      return Err(invalid("owner must be a GitHub user or organization name"));
    }
    if !NAME_REGEX.is_match(repo) || repo == "." || repo == ".." {
      return Err(invalid("repository name is not valid"));
    }
    if branch.is_empty() || branch.chars().any(char::is_whitespace) || branch.contains("..") {
      return Err(invalid("branch name is not a valid git ref"));
    }
    if branch.contains(['*', '?', '[']) {
      return Err(invalid("branch protection targets a single branch, wildcards are not supported"));
    }

    Ok(Self {
      owner: owner.to_string(),
      repo: repo.to_string(),
      branch: branch.to_string(),
    })
  }

  pub fn owner(&self) -> &str {
    &self.owner
  }

  pub fn repo(&self) -> &str {
    &self.repo
  }

  pub fn branch(&self) -> &str {
    &self.branch
  }

  fn from_url(input: &str) -> Result<Self, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidTarget {
      input: input.to_string(),
      reason: reason.to_string(),
    };

    let url = Url::parse(input).map_err(|e| invalid(&e.to_string()))?;
    let segments: Vec<&str> = url
      .path_segments()
      .map(|segments| segments.filter(|s| !s.is_empty()).collect())
      .unwrap_or_default();

    // https://github.com/<owner>/<repo>/tree/<branch...>
    match segments.as_slice() {
      [owner, repo, "tree", branch @ ..] if !branch.is_empty() => {
        let repo = repo.strip_suffix(".git").unwrap_or(*repo);
        Self::new(owner, repo, &branch.join("/"))
      }
      _ => Err(invalid("expected a URL of the form https://github.com/<owner>/<repo>/tree/<branch>")),
    }
  }
}

impl FromStr for BranchTarget {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let input = s.trim();
    if input.starts_with("https://") || input.starts_with("http://") {
      return Self::from_url(input);
    }

    match SHORTHAND_REGEX.captures(input) {
      Some(captures) => Self::new(&captures[1], &captures[2], &captures[3]),
      None => Err(ConfigError::InvalidTarget {
        input: s.to_string(),
        reason: "expected <owner>/<repo>:<branch>".to_string(),
      }),
    }
  }
}

impl fmt::Display for BranchTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}:{}", self.owner, self.repo, self.branch)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_shorthand() {
    let target: BranchTarget = "eddieland/fence:main".parse().unwrap();
    assert_eq!(target.owner(), "eddieland");
    assert_eq!(target.repo(), "fence");
    assert_eq!(target.branch(), "main");
    assert_eq!(target.to_string(), "eddieland/fence:main");
  }

  #[test]
  fn test_parse_shorthand_with_slashed_branch() {
    let target: BranchTarget = "octo/hello-world:release/2.x".parse().unwrap();
    assert_eq!(target.branch(), "release/2.x");
  }

  #[test]
  fn test_parse_url() {
    let target: BranchTarget = "https://github.com/octo/hello.world/tree/release/v1".parse().unwrap();
    assert_eq!(target.owner(), "octo");
    assert_eq!(target.repo(), "hello.world");
    assert_eq!(target.branch(), "release/v1");
  }

  #[test]
  fn test_reject_missing_branch() {
    assert!("octo/hello".parse::<BranchTarget>().is_err());
    assert!("octo/hello:".parse::<BranchTarget>().is_err());
    assert!("https://github.com/octo/hello".parse::<BranchTarget>().is_err());
  }

  #[test]
  fn test_reject_invalid_components() {
    assert!(BranchTarget::new("", "repo", "main").is_err());
    assert!(BranchTarget::new("octo", "re po", "main").is_err());
    assert!(BranchTarget::new("octo", "repo", "has space").is_err());
    assert!(BranchTarget::new("octo", "repo", "release/*").is_err());

    let err = BranchTarget::new("octo", "..", "main").unwrap_err();
    assert!(err.to_string().contains("octo/..:main"));
  }
}
