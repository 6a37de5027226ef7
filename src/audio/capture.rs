//! Microphone capture via `cpal`.
//!
//! [`AudioCapture::start`] streams raw [`AudioChunk`]s over an mpsc channel
//! until the returned [`StreamHandle`] is dropped.
//! [`AudioCapture::record`] builds on it to grab one fixed-length window and
//! hand back Whisper-ready 16 kHz mono samples.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::resample::{resample_to_16k, stereo_to_mono};

/// Extra time allowed past the window before giving up on a silent device.
const STALL_GRACE: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// One callback's worth of interleaved `f32` samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// Keeps the cpal stream alive; dropping it stops capture.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("input device stopped delivering audio after {received} of {expected} samples")]
    Stalled { received: usize, expected: usize },
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// The system default input device and its preferred stream config.
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_rate: u32,
    channels: u16,
}

impl AudioCapture {
    /// Open the default input device.
    pub fn new() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;
        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        Ok(Self {
            device,
            config,
            sample_rate,
            channels,
        })
    }

    /// Start streaming chunks to `tx` from cpal's audio thread.
    ///
    /// Send errors are ignored so the audio thread never panics once the
    /// receiver is gone.
    pub fn start(&self, tx: mpsc::Sender<AudioChunk>) -> Result<StreamHandle, CaptureError> {
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let _ = tx.send(AudioChunk {
                    samples: data.to_vec(),
                    sample_rate,
                    channels,
                });
            },
            |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }

    /// Block for `window`, then return the recording as 16 kHz mono.
    ///
    /// Fails with [`CaptureError::Stalled`] if the device delivers too little
    /// audio within `window` plus a short grace period.
    pub fn record(&self, window: Duration) -> Result<Vec<f32>, CaptureError> {
        let expected = samples_needed(window, self.sample_rate, self.channels);
        let (tx, rx) = mpsc::channel::<AudioChunk>();
        let handle = self.start(tx)?;

        let deadline = Instant::now() + window + STALL_GRACE;
        let mut raw: Vec<f32> = Vec::with_capacity(expected);
        while raw.len() < expected {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(chunk) => raw.extend_from_slice(&chunk.samples),
                Err(_) => {
                    return Err(CaptureError::Stalled {
                        received: raw.len(),
                        expected,
                    })
                }
            }
        }
        drop(handle);
        raw.truncate(expected);

        log::debug!(
            "audio: captured {:.1}s @ {} Hz x{}",
            window.as_secs_f32(),
            self.sample_rate,
            self.channels
        );
        Ok(to_whisper_format(&raw, self.sample_rate, self.channels))
    }
}

/// Interleaved sample count covering `window` at `rate` Hz and `channels`.
pub fn samples_needed(window: Duration, rate: u32, channels: u16) -> usize {
    let frames = (window.as_secs_f64() * rate as f64).round() as usize;
    frames * channels.max(1) as usize
}

/// Downmix then resample to the 16 kHz mono layout Whisper expects.
pub fn to_whisper_format(samples: &[f32], rate: u32, channels: u16) -> Vec<f32> {
    let mono = stereo_to_mono(samples, channels);
    resample_to_16k(&mono, rate)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_chunk_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AudioChunk>();
    }

    #[test]
    fn five_seconds_at_48k_stereo() {
        assert_eq!(samples_needed(Duration::from_secs(5), 48_000, 2), 480_000);
    }

    #[test]
    fn zero_channels_counts_as_mono() {
        assert_eq!(samples_needed(Duration::from_secs(1), 16_000, 0), 16_000);
    }

    #[test]
    fn whisper_format_from_48k_stereo() {
        // 1 s of 48 kHz stereo becomes 1 s of 16 kHz mono.
        let stereo = vec![0.25_f32; 96_000];
        let out = to_whisper_format(&stereo, 48_000, 2);
        assert_eq!(out.len(), 16_000);
        assert!(out.iter().all(|s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn whisper_format_passthrough_at_16k_mono() {
        let mono = vec![0.1_f32; 8_000];
        assert_eq!(to_whisper_format(&mono, 16_000, 1), mono);
    }
}
