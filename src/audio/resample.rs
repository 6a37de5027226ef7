//! Channel mixing and sample-rate conversion for the capture window.
//!
//! Whisper wants 16 kHz mono `f32`; input devices usually deliver 44.1 or
//! 48 kHz stereo. Linear interpolation is plenty for speech recognition.

/// Average interleaved channels down to mono.
///
/// `channels == 0` yields an empty vector; `channels == 1` is a plain copy.
///
/// ```rust
/// use desk_chat::audio::stereo_to_mono;
///
/// let mono = stereo_to_mono(&[0.5, -0.5, 0.2, 0.4], 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

/// Resample mono audio from `source_rate` to 16 000 Hz.
///
/// ```rust
/// use desk_chat::audio::resample_to_16k;
///
/// assert_eq!(resample_to_16k(&vec![0.5; 480], 48_000).len(), 160);
/// ```
pub fn resample_to_16k(samples: &[f32], source_rate: u32) -> Vec<f32> {
    const TARGET_RATE: u32 = 16_000;

    if source_rate == TARGET_RATE || source_rate == 0 {
        return samples.to_vec();
    }
    if samples.is_empty() {
        return Vec::new();
    }

    let ratio = TARGET_RATE as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = src_pos as usize;
            let frac = (src_pos - idx as f64) as f32;
            match (samples.get(idx), samples.get(idx + 1)) {
                (Some(a), Some(b)) => a * (1.0 - frac) + b * frac,
                (Some(a), None) => *a,
                _ => 0.0,
            }
        })
        .collect()
}
