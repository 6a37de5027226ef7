//! Configuration module for desk-chat.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for cross-platform file locations, TOML persistence via
//! `AppConfig::load` / `AppConfig::save`, and the `RoleTable` read from
//! `roles.json`.

pub mod paths;
pub mod roles;
pub mod settings;

pub use paths::AppPaths;
pub use roles::{RoleTable, RoleTableError};
pub use settings::{AppConfig, LlmConfig, SttConfig, Theme, TtsConfig, UiConfig};
