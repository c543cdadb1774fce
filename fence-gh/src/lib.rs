//! # GitHub Branch Protection Client
//!
//! REST client for the branch-protection resource and its sub-resources. Each
//! call is a single attempt with a bounded timeout; failures are classified
//! into [`ProtectionError`] so callers can decide whether to retry.

pub mod api;
pub mod auth;
pub mod client;
pub mod consts;
pub mod endpoints;
pub mod error;
pub mod models;

pub use api::ProtectionApi;
pub use auth::token_from_env;
// Re-export the client
pub use client::{GitHubClient, create_github_client};
pub use error::ProtectionError;
pub use models::GitHubAuth;
