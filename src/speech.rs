//! Blocking voice bridges used by the orchestrator.
//!
//! Both traits are `Send + Sync` so they can sit behind an `Arc<dyn …>` and
//! be called from `spawn_blocking`.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::audio::{AudioCapture, CaptureError};
use crate::stt::{SttEngine, SttError};
use crate::tts::{TtsError, TtsWorker};

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("microphone: {0}")]
    Capture(#[from] CaptureError),

    #[error("speech recognition: {0}")]
    Stt(#[from] SttError),

    #[error("read-aloud: {0}")]
    Tts(#[from] TtsError),

    #[error("{0}")]
    Unavailable(String),
}

/// Record a fixed window from the microphone and return its transcript.
pub trait SpeechInput: Send + Sync {
    fn capture_and_transcribe(&self) -> Result<String, SpeechError>;
}

/// Speak text aloud, returning once playback has finished.
pub trait SpeechOutput: Send + Sync {
    fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

// ---------------------------------------------------------------------------
// MicrophoneInput
// ---------------------------------------------------------------------------

/// Default input device + Whisper.
///
/// The cpal device is opened per call so the bridge itself stays `Send`.
pub struct MicrophoneInput {
    stt: Arc<dyn SttEngine>,
    window: Duration,
}

impl MicrophoneInput {
    pub fn new(stt: Arc<dyn SttEngine>, window: Duration) -> Self {
        Self { stt, window }
    }
}

impl SpeechInput for MicrophoneInput {
    fn capture_and_transcribe(&self) -> Result<String, SpeechError> {
        let capture = AudioCapture::new()?;
        log::info!("speech: listening for {:.0}s", self.window.as_secs_f32());
        let audio = capture.record(self.window)?;
        Ok(self.stt.transcribe(&audio)?)
    }
}

impl SpeechOutput for TtsWorker {
    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        Ok(TtsWorker::speak(self, text)?)
    }
}

// ---------------------------------------------------------------------------
// Unavailable
// ---------------------------------------------------------------------------

/// Stand-in used when a model could not be loaded at startup.
///
/// Every call fails with the reason given here.
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SpeechInput for Unavailable {
    fn capture_and_transcribe(&self) -> Result<String, SpeechError> {
        Err(SpeechError::Unavailable(self.reason.clone()))
    }
}

impl SpeechOutput for Unavailable {
    fn speak(&self, _text: &str) -> Result<(), SpeechError> {
        Err(SpeechError::Unavailable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_reports_reason_both_ways() {
        let stand_in = Unavailable::new("no Whisper model at /m/ggml-tiny.bin");
        let err = stand_in.capture_and_transcribe().unwrap_err();
        assert_eq!(err.to_string(), "no Whisper model at /m/ggml-tiny.bin");
        assert!(matches!(stand_in.speak("hi"), Err(SpeechError::Unavailable(_))));
    }

    #[test]
    fn wrapped_errors_name_their_source() {
        let err = SpeechError::from(SttError::AudioTooShort);
        assert!(err.to_string().starts_with("speech recognition:"));
        let err = SpeechError::from(TtsError::WorkerGone);
        assert!(err.to_string().starts_with("read-aloud:"));
    }

    #[test]
    fn bridges_are_object_safe() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn SpeechInput>();
        assert_send_sync::<dyn SpeechOutput>();
        assert_send_sync::<MicrophoneInput>();
    }
}
