//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through `settings.toml` and handed to the
//! background workers.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Settings for the chat-completion endpoint.
///
/// The API key is deliberately absent: it lives in `config.json` and is
/// managed by [`crate::credential::CredentialStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API (no trailing `/v1`).
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Optional client-side timeout. `None` leaves timing out to the server.
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            model: "gpt-3.5-turbo".into(),
            temperature: 0.7,
            timeout_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for voice input (capture window + Whisper).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// GGML model file stem, resolved as `models/ggml-{model}.bin`.
    pub model: String,
    /// ISO-639-1 language code passed to Whisper, or `"auto"`.
    pub language: String,
    /// Length of the fixed recording window in seconds.
    pub capture_secs: u32,
    /// Sample rate handed to Whisper. Whisper only accepts 16 000.
    pub sample_rate: u32,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "tiny".into(),
            language: "zh".into(),
            capture_secs: 5,
            sample_rate: 16_000,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for read-aloud.
///
/// The model directory `models/{model}/` is expected to contain
/// `model.onnx`, `tokens.txt` and optionally `lexicon.txt`, `dict/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// VITS model directory name under the models dir.
    pub model: String,
    /// Speaker id for multi-speaker models.
    pub speaker_id: i32,
    /// Speech rate multiplier (1.0 = normal).
    pub speed: f32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            model: "vits-zh-aishell3".into(),
            speaker_id: 0,
            speed: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Colour scheme of the main window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    /// The other theme.
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::Light
    }
}

/// Window appearance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Theme used at startup; updated when the user toggles it.
    pub theme: Theme,
    /// Initial inner size of the main window.
    pub window_size: (f32, f32),
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            window_size: (920.0, 580.0),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use desk_chat::config::AppConfig;
///
/// // Returns Default when the file is missing.
/// let config = AppConfig::load().unwrap();
/// assert_eq!(config.stt.capture_secs, 5);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Chat-completion settings.
    pub llm: LlmConfig,
    /// Voice input settings.
    pub stt: SttConfig,
    /// Read-aloud settings.
    pub tts: TtsConfig,
    /// Window settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
