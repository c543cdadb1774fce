//! Test utilities shared across the fence workspace
//!
//! This crate provides common testing infrastructure including:
//! - An in-memory GitHub stand-in ([`FakeProtectionApi`])
//! - Environment isolation for configuration and credentials ([`EnvTestGuard`])
//!
//! The clippy dead_code lint is disabled for this crate because test utilities
//! may not be used by all tests, and the compiler cannot detect usage across
//! crate boundaries in development dependencies.

#![allow(dead_code)]

pub mod env;
pub mod fake;

// Re-export commonly used items
pub use env::EnvTestGuard;
pub use fake::{Call, CallKind, FakeProtectionApi};
