//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings, credential, roles, history):
//!   Windows: %APPDATA%\desk-chat\
//!   macOS:   ~/Library/Application Support/desk-chat/
//!   Linux:   ~/.config/desk-chat/
//!
//! Data dir (Whisper + VITS models):
//!   Windows: %LOCALAPPDATA%\desk-chat\
//!   macOS:   ~/Library/Application Support/desk-chat/
//!   Linux:   ~/.local/share/desk-chat/
//!
//! Setting `DESK_CHAT_HOME` puts every file (models included) under that one
//! directory instead, which is handy for portable installs.

use std::path::{Path, PathBuf};

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding every user-editable file.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to `config.json` (the API key).
    pub credential_file: PathBuf,
    /// Full path to `roles.json`.
    pub roles_file: PathBuf,
    /// Full path to `history.json`.
    pub history_file: PathBuf,
    /// Directory for the GGML and ONNX model files.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "desk-chat";
    const HOME_ENV: &'static str = "DESK_CHAT_HOME";

    /// Resolves all paths, honouring `DESK_CHAT_HOME` when set.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        if let Some(home) = std::env::var_os(Self::HOME_ENV).filter(|v| !v.is_empty()) {
            return Self::in_dir(home);
        }

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self::with_dirs(config_dir, data_dir.join("models"))
    }

    /// Place every file directly under `dir` (models in `dir/models`).
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let models_dir = dir.join("models");
        Self::with_dirs(dir, models_dir)
    }

    fn with_dirs(config_dir: PathBuf, models_dir: PathBuf) -> Self {
        Self {
            settings_file: config_dir.join("settings.toml"),
            credential_file: config_dir.join("config.json"),
            roles_file: config_dir.join("roles.json"),
            history_file: config_dir.join("history.json"),
            config_dir,
            models_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths.models_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
        assert!(paths
            .history_file
            .file_name()
            .is_some_and(|n| n == "history.json"));
    }

    #[test]
    fn in_dir_keeps_everything_together() {
        let paths = AppPaths::in_dir("/tmp/desk-chat-portable");
        let root = Path::new("/tmp/desk-chat-portable");
        assert_eq!(paths.config_dir, root);
        assert_eq!(paths.credential_file, root.join("config.json"));
        assert_eq!(paths.roles_file, root.join("roles.json"));
        assert_eq!(paths.models_dir, root.join("models"));
    }
}
