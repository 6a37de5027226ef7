//! `SttEngine` trait and the Whisper implementation.
//!
//! [`SttEngine`] is object-safe and `Send + Sync` so it can be held behind
//! an `Arc<dyn SttEngine>` and called from `spawn_blocking`.
//!
//! [`WhisperEngine`] wraps a `whisper_rs::WhisperContext`; a fresh
//! `WhisperState` is created per call so no locking is needed.

use std::path::Path;

use thiserror::Error;
use whisper_rs::{FullParams, WhisperContext, WhisperContextParameters};

use crate::stt::transcribe::{SamplingStrategy, TranscribeParams};

/// Minimum audio length: 0.5 s at 16 kHz.
pub const MIN_AUDIO_SAMPLES: usize = 8_000;
/// Maximum audio length: 60 s at 16 kHz.
pub const MAX_AUDIO_SAMPLES: usize = 960_000;

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum SttError {
    #[error("speech model not found: {0}")]
    ModelNotFound(String),

    #[error("cannot initialise Whisper: {0}")]
    ContextInit(String),

    #[error("transcription error: {0}")]
    Transcription(String),

    #[error("audio too short (minimum 0.5 s)")]
    AudioTooShort,

    #[error("audio too long (maximum 60 s)")]
    AudioTooLong,
}

// ---------------------------------------------------------------------------
// SttEngine trait
// ---------------------------------------------------------------------------

/// Speech-to-text over a complete buffer.
///
/// `audio` must be 16 kHz mono `f32` PCM between
/// [`MIN_AUDIO_SAMPLES`] and [`MAX_AUDIO_SAMPLES`] long.
pub trait SttEngine: Send + Sync {
    fn transcribe(&self, audio: &[f32]) -> Result<String, SttError>;
}

fn check_length(audio: &[f32]) -> Result<(), SttError> {
    if audio.len() < MIN_AUDIO_SAMPLES {
        return Err(SttError::AudioTooShort);
    }
    if audio.len() > MAX_AUDIO_SAMPLES {
        return Err(SttError::AudioTooLong);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

pub struct WhisperEngine {
    ctx: WhisperContext,
    params: TranscribeParams,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WhisperEngine({:?})", self.params.language)
    }
}

// SAFETY: whisper-rs declares WhisperContext Send + Sync; the weights are
// read-only after loading and each call builds its own state.
unsafe impl Send for WhisperEngine {}
unsafe impl Sync for WhisperEngine {}

impl WhisperEngine {
    /// Load a GGML model file.
    pub fn load(model_path: impl AsRef<Path>, params: TranscribeParams) -> Result<Self, SttError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!("non-UTF-8 model path: {}", path.display()))
        })?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        Ok(Self { ctx, params })
    }

    fn full_params(&self) -> FullParams<'_, '_> {
        use whisper_rs::SamplingStrategy as WS;
        let strategy = match self.params.strategy {
            SamplingStrategy::Greedy { best_of } => WS::Greedy { best_of },
            SamplingStrategy::BeamSearch {
                beam_size,
                patience,
            } => WS::BeamSearch {
                beam_size,
                patience,
            },
        };

        let mut fp = FullParams::new(strategy);
        let lang = match self.params.language.as_str() {
            "auto" => None,
            code => Some(code),
        };
        fp.set_language(lang);
        fp.set_n_threads(self.params.n_threads);
        if self.params.suppress_progress {
            fp.set_print_progress(false);
            fp.set_print_realtime(false);
        }
        fp
    }
}

impl SttEngine for WhisperEngine {
    fn transcribe(&self, audio: &[f32]) -> Result<String, SttError> {
        check_length(audio)?;

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        let failed = |e: whisper_rs::WhisperError| SttError::Transcription(e.to_string());
        let started = std::time::Instant::now();
        state.full(self.full_params(), audio).map_err(failed)?;

        let n_segments = state.full_n_segments().map_err(failed)?;
        let text = (0..n_segments)
            .map(|i| state.full_get_segment_text(i).map_err(failed))
            .collect::<Result<Vec<_>, _>>()?
            .concat();

        log::debug!(
            "stt: {n_segments} segments in {} ms",
            started.elapsed().as_millis()
        );
        Ok(text.trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// CannedStt  (test-only)
// ---------------------------------------------------------------------------

/// Returns a canned response; still enforces the length contract.
#[cfg(test)]
pub struct CannedStt {
    response: Result<String, SttError>,
}

#[cfg(test)]
impl CannedStt {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
        }
    }

    pub fn err(error: SttError) -> Self {
        Self {
            response: Err(error),
        }
    }
}

#[cfg(test)]
impl SttEngine for CannedStt {
    fn transcribe(&self, audio: &[f32]) -> Result<String, SttError> {
        check_length(audio)?;
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_configured_text() {
        let engine = CannedStt::ok("你好");
        let audio = vec![0.0f32; MIN_AUDIO_SAMPLES];
        assert_eq!(engine.transcribe(&audio).unwrap(), "你好");
    }

    #[test]
    fn mock_returns_configured_error() {
        let engine = CannedStt::err(SttError::Transcription("boom".into()));
        let err = engine.transcribe(&vec![0.0f32; MIN_AUDIO_SAMPLES]).unwrap_err();
        assert!(matches!(err, SttError::Transcription(_)));
    }

    #[test]
    fn length_bounds_are_enforced() {
        let engine = CannedStt::ok("text");
        assert!(matches!(
            engine.transcribe(&vec![0.0f32; MIN_AUDIO_SAMPLES - 1]),
            Err(SttError::AudioTooShort)
        ));
        assert!(matches!(
            engine.transcribe(&vec![0.0f32; MAX_AUDIO_SAMPLES + 1]),
            Err(SttError::AudioTooLong)
        ));
    }

    #[test]
    fn five_second_window_is_within_bounds() {
        assert!(check_length(&vec![0.0f32; 5 * 16_000]).is_ok());
    }

    #[test]
    fn load_missing_model_returns_model_not_found() {
        let result = WhisperEngine::load("/nonexistent/ggml-tiny.bin", TranscribeParams::default());
        assert!(
            matches!(result, Err(SttError::ModelNotFound(_))),
            "expected ModelNotFound, got: {result:?}"
        );
    }

    #[test]
    fn model_not_found_mentions_path() {
        let e = SttError::ModelNotFound("/some/ggml-tiny.bin".into());
        assert!(e.to_string().contains("/some/ggml-tiny.bin"));
    }
}
