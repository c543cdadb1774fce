//! # Fence Core Library
//!
//! Shared building blocks for fence: the built-in protection presets and the
//! loader that validates settings documents into them, branch targets, the
//! normalized protection state read back from GitHub, tool configuration and
//! console output helpers.

pub mod actor;
pub mod config;
pub mod consts;
pub mod error;
pub mod output;
pub mod preset;
pub mod protection;
pub mod settings;
pub mod target;

// Re-export main types
pub use actor::Actor;
pub use config::{ConfigDirs, FenceConfig, get_config_dirs};
pub use error::{ConfigError, ErrorKind};
pub use output::{ColorMode, print_error, print_info, print_success};
pub use preset::{PresetName, ProtectionPreset, load_preset};
pub use protection::{ProtectionState, PushRestrictions, ReviewRules, StatusChecks};
pub use settings::{PresetSource, ProtectionSettings, SettingsFormat, load_settings, parse_settings_document};
pub use target::BranchTarget;
