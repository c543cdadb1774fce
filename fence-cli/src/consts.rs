//! Constants for the fence CLI
//!
//! Process exit statuses. Usage errors reported by clap exit with 2.

/// Every step applied or unchanged
pub const EXIT_COMPLETED: u8 = 0;

/// At least one step failed, or a command failed outright
pub const EXIT_PARTIALLY_FAILED: u8 = 1;

/// Settings or targets were rejected before any network call
pub const EXIT_ABORTED: u8 = 3;

/// Interrupted; 128 + SIGINT
pub const EXIT_CANCELLED: u8 = 130;
