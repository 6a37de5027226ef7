//! API key storage and the interactive key-entry flow.
//!
//! The key lives in `config.json` as `{"api_key": "sk-..."}`.
//! [`CredentialStore::load`] treats every failure (missing file, bad JSON,
//! missing or empty field) as "no key yet", so a damaged file just sends the
//! user back to the key prompt. Validation is not the store's job: callers
//! go through [`Credential::parse`] (or [`CredentialPrompt`]) before saving.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix every accepted key must start with.
pub const KEY_PREFIX: &str = "sk-";

// ---------------------------------------------------------------------------
// CredentialError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CredentialError {
    /// Nothing was entered (or the user declined to enter anything).
    #[error("no API key provided")]
    Missing,

    /// The key does not look like a vendor key.
    #[error("API key must start with \"{KEY_PREFIX}\"")]
    Invalid,

    /// Writing `config.json` failed.
    #[error("cannot save API key to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialise API key file: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// A validated-or-loaded API key.
///
/// `Debug` is redacted so the key never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Trim and validate user input.
    ///
    /// ```
    /// use desk_chat::credential::{Credential, CredentialError};
    ///
    /// assert!(Credential::parse("  sk-abc123 ").is_ok());
    /// assert!(matches!(Credential::parse("abc"), Err(CredentialError::Invalid)));
    /// assert!(matches!(Credential::parse("   "), Err(CredentialError::Missing)));
    /// ```
    pub fn parse(input: &str) -> Result<Self, CredentialError> {
        let key = input.trim();
        if key.is_empty() {
            return Err(CredentialError::Missing);
        }
        if !key.starts_with(KEY_PREFIX) {
            return Err(CredentialError::Invalid);
        }
        Ok(Self(key.to_string()))
    }

    /// Wrap a raw value without validation (what the store hands back).
    pub fn new_unchecked(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// `true` when the key is non-empty and carries the vendor prefix.
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty() && self.0.starts_with(KEY_PREFIX)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: String = self.0.chars().take(KEY_PREFIX.len()).collect();
        write!(f, "Credential({shown}***)")
    }
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default)]
    api_key: Option<String>,
}

/// Reads and writes `config.json`.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored key. Any problem reading it means "absent".
    pub fn load(&self) -> Option<Credential> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) => {
                log::debug!("no credential at {} ({e})", self.path.display());
                return None;
            }
        };
        match serde_json::from_str::<CredentialFile>(&data) {
            Ok(CredentialFile { api_key: Some(key) }) if !key.is_empty() => {
                Some(Credential::new_unchecked(key))
            }
            Ok(_) => None,
            Err(e) => {
                log::warn!("ignoring malformed {}: {e}", self.path.display());
                None
            }
        }
    }

    /// Persist `credential` so the next [`load`](Self::load) returns it.
    pub fn save(&self, credential: &Credential) -> Result<(), CredentialError> {
        let io_err = |source| CredentialError::Save {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = CredentialFile {
            api_key: Some(credential.expose().to_string()),
        };
        let json = serde_json::to_string_pretty(&body)?;
        std::fs::write(&self.path, json).map_err(io_err)?;
        log::info!("API key saved to {}", self.path.display());
        Ok(())
    }

    /// Load the stored key if it passes validation.
    pub fn load_valid(&self) -> Option<Credential> {
        self.load().filter(Credential::is_valid)
    }
}

// ---------------------------------------------------------------------------
// CredentialPrompt
// ---------------------------------------------------------------------------

/// Outcome of the key-entry flow as seen by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptState {
    /// Waiting for input; `error` holds the last rejection message.
    Asking { error: Option<String> },
    /// A valid key was saved.
    Accepted,
    /// The user refused to provide a key. Fatal for the process.
    Declined,
}

/// Interactive key capture: only valid keys are ever persisted.
pub struct CredentialPrompt {
    store: CredentialStore,
    state: PromptState,
}

impl CredentialPrompt {
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store,
            state: PromptState::Asking { error: None },
        }
    }

    pub fn state(&self) -> &PromptState {
        &self.state
    }

    /// Validate `input`; save and return it only when valid.
    ///
    /// On rejection the prompt stays in [`PromptState::Asking`] with the
    /// reason attached, and nothing is written.
    pub fn submit(&mut self, input: &str) -> Result<Credential, CredentialError> {
        let outcome = Credential::parse(input).and_then(|credential| {
            self.store.save(&credential)?;
            Ok(credential)
        });
        self.state = match &outcome {
            Ok(_) => PromptState::Accepted,
            Err(e) => PromptState::Asking {
                error: Some(e.to_string()),
            },
        };
        outcome
    }

    /// The user cancelled the dialog.
    pub fn decline(&mut self) {
        log::warn!("API key entry declined");
        self.state = PromptState::Declined;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
