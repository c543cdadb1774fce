//! # GitHub API Endpoints
//!
//! Endpoint implementations for the branch-protection resource and its
//! sub-resources.

pub mod protection;
