//! Microphone capture for voice questions.
//!
//! ```text
//! default input device → cpal callback → AudioChunk (mpsc)
//!     → fixed window → stereo_to_mono → resample_to_16k → Whisper
//! ```
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use desk_chat::audio::AudioCapture;
//!
//! let capture = AudioCapture::new().unwrap();
//! let samples = capture.record(Duration::from_secs(5)).unwrap();
//! assert_eq!(samples.len(), 5 * 16_000);
//! ```

pub mod capture;
pub mod resample;

pub use capture::{samples_needed, to_whisper_format, AudioCapture, AudioChunk, CaptureError, StreamHandle};
pub use resample::{resample_to_16k, stereo_to_mono};
