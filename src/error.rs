//! Crate-level failure classification.
//!
//! Each module has its own `thiserror` enum; [`AssistantError`] folds them
//! into the handful of kinds the shell and `main` act on.

use thiserror::Error;

use crate::config::RoleTableError;
use crate::credential::CredentialError;
use crate::history::HistoryError;
use crate::llm::UpstreamError;
use crate::orchestrator::SubmitError;
use crate::speech::SpeechError;

/// How a failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input. Shown inline, nothing dispatched.
    Validation,
    /// No API key. The user is asked for one; declining ends the process.
    CredentialMissing,
    /// The key was rejected locally or by the API.
    CredentialInvalid,
    /// The completion request failed.
    Upstream,
    /// Writing a local file failed. The answer is still shown.
    Persistence,
    /// Startup cannot continue.
    ConfigFatal,
    /// Microphone, recognition or read-aloud failed.
    Speech,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::CredentialMissing => "CredentialMissing",
            ErrorKind::CredentialInvalid => "CredentialInvalid",
            ErrorKind::Upstream => "UpstreamError",
            ErrorKind::Persistence => "PersistenceError",
            ErrorKind::ConfigFatal => "ConfigFatal",
            ErrorKind::Speech => "SpeechError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("{0}")]
    Validation(String),

    #[error("no API key configured")]
    CredentialMissing,

    #[error("invalid API key: {0}")]
    CredentialInvalid(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("{0}")]
    Persistence(String),

    #[error("{0}")]
    ConfigFatal(String),

    #[error(transparent)]
    Speech(#[from] SpeechError),
}

impl AssistantError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssistantError::Validation(_) => ErrorKind::Validation,
            AssistantError::CredentialMissing => ErrorKind::CredentialMissing,
            AssistantError::CredentialInvalid(_) => ErrorKind::CredentialInvalid,
            AssistantError::Upstream(UpstreamError::Unauthorized(_)) => ErrorKind::CredentialInvalid,
            AssistantError::Upstream(_) => ErrorKind::Upstream,
            AssistantError::Persistence(_) => ErrorKind::Persistence,
            AssistantError::ConfigFatal(_) => ErrorKind::ConfigFatal,
            AssistantError::Speech(_) => ErrorKind::Speech,
        }
    }
}

impl From<CredentialError> for AssistantError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::Missing => AssistantError::CredentialMissing,
            CredentialError::Invalid => AssistantError::CredentialInvalid(e.to_string()),
            CredentialError::Save { .. } | CredentialError::Serialize(_) => {
                AssistantError::Persistence(e.to_string())
            }
        }
    }
}

impl From<HistoryError> for AssistantError {
    fn from(e: HistoryError) -> Self {
        AssistantError::Persistence(e.to_string())
    }
}

impl From<RoleTableError> for AssistantError {
    fn from(e: RoleTableError) -> Self {
        AssistantError::ConfigFatal(e.to_string())
    }
}

impl From<SubmitError> for AssistantError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::CredentialMissing => AssistantError::CredentialMissing,
            other => AssistantError::Validation(other.to_string()),
        }
    }
}
