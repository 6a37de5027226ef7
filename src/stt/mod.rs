//! Speech-to-text engine.
//!
//! ```rust,no_run
//! use desk_chat::stt::{SttEngine, TranscribeParams, WhisperEngine};
//!
//! let engine = WhisperEngine::load("models/ggml-tiny.bin", TranscribeParams::default())
//!     .expect("model not found");
//!
//! // 16 kHz, mono, f32 PCM from the audio module
//! let audio: Vec<f32> = vec![0.0; 5 * 16_000];
//! println!("{}", engine.transcribe(&audio).unwrap());
//! ```

pub mod engine;
pub mod transcribe;

pub use engine::{SttEngine, SttError, WhisperEngine, MAX_AUDIO_SAMPLES, MIN_AUDIO_SAMPLES};
pub use transcribe::{SamplingStrategy, TranscribeParams};

/// File name of the GGML model for a configured model stem.
///
/// ```
/// assert_eq!(desk_chat::stt::model_file_name("tiny"), "ggml-tiny.bin");
/// ```
pub fn model_file_name(model: &str) -> String {
    format!("ggml-{model}.bin")
}
