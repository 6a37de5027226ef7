//! Whisper decoding parameters.

/// Owned mirror of `whisper_rs::SamplingStrategy`. Greedy by default.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingStrategy {
    Greedy { best_of: i32 },
    BeamSearch { beam_size: i32, patience: f32 },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        Self::Greedy { best_of: 1 }
    }
}

/// Parameters for one Whisper run.
///
/// ```
/// use desk_chat::stt::TranscribeParams;
///
/// let params = TranscribeParams::for_language("en");
/// assert_eq!(params.language, "en");
/// ```
#[derive(Debug, Clone)]
pub struct TranscribeParams {
    /// ISO-639-1 code, or `"auto"` for Whisper's own detection.
    pub language: String,
    pub strategy: SamplingStrategy,
    /// CPU threads handed to Whisper.
    pub n_threads: i32,
    /// Silence whisper.cpp's progress output on stderr.
    pub suppress_progress: bool,
}

impl TranscribeParams {
    pub fn for_language(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Self::default()
        }
    }
}

impl Default for TranscribeParams {
    fn default() -> Self {
        Self {
            language: "zh".into(),
            strategy: SamplingStrategy::default(),
            n_threads: optimal_threads(),
            suppress_progress: true,
        }
    }
}

/// Available parallelism capped at 8; Whisper gains little past that.
pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}
