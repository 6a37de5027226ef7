//! Request state machine, status line and the events the shell reacts to.

use crate::error::ErrorKind;

// ---------------------------------------------------------------------------
// RequestState
// ---------------------------------------------------------------------------

/// Lifecycle of the single chat request slot.
///
/// ```text
/// Idle ──submit──▶ Sending ──answer──▶ Succeeded ─┐
///                          ──error───▶ Failed ────┴─▶ Idle
/// ```
///
/// `Succeeded` and `Failed` fold back into `Idle` as soon as the outcome is
/// applied; the orchestrator keeps the last one for the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Sending,
    Succeeded,
    Failed,
}

impl RequestState {
    /// `true` while a request is in flight.
    ///
    /// ```
    /// use desk_chat::orchestrator::RequestState;
    ///
    /// assert!(RequestState::Sending.is_busy());
    /// assert!(!RequestState::Idle.is_busy());
    /// assert!(!RequestState::Failed.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, RequestState::Sending)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestState::Idle => "Idle",
            RequestState::Sending => "Sending",
            RequestState::Succeeded => "Succeeded",
            RequestState::Failed => "Failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// What the status line shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Waiting,
    NeedQuestion,
    Sending,
    Done,
    Error,
    Listening,
    Transcribed,
    Speaking,
    SpeechFailed,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Waiting => "Waiting",
            Status::NeedQuestion => "Please enter a question",
            Status::Sending => "Sending…",
            Status::Done => "Done",
            Status::Error => "Error",
            Status::Listening => "Listening, please speak…",
            Status::Transcribed => "Transcription complete",
            Status::Speaking => "Speaking…",
            Status::SpeechFailed => "Speech error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Events and notices
// ---------------------------------------------------------------------------

/// Emitted by [`poll`](super::Orchestrator::poll) when an outcome is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent {
    /// The answer is on display and submissions are enabled again.
    AnswerReady(String),
    /// The request failed; the display holds the error text.
    RequestFailed(String),
    /// The history snapshot was reloaded from disk.
    HistoryChanged,
    /// A voice question was transcribed; the shell puts it in the input box.
    TranscriptReady(String),
    /// Read-aloud finished.
    SpeechFinished,
    /// A non-fatal problem was recorded in the notice list.
    Notice(Notice),
}

/// A non-fatal problem worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: ErrorKind,
    pub message: String,
}

impl Notice {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_sending_is_busy() {
        for state in [RequestState::Idle, RequestState::Succeeded, RequestState::Failed] {
            assert!(!state.is_busy(), "{state:?}");
        }
        assert!(RequestState::Sending.is_busy());
    }

    #[test]
    fn default_is_idle_and_waiting() {
        assert_eq!(RequestState::default(), RequestState::Idle);
        assert_eq!(Status::default().to_string(), "Waiting");
    }
}
