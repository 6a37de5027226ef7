//! Read-aloud: VITS synthesis (`sherpa-rs`) played through `rodio`.
//!
//! Neither the VITS engine nor rodio's output stream may leave the thread
//! that created them, so both live on one dedicated worker thread.
//! [`TtsWorker::speak`] posts the text to that thread and blocks until
//! playback has finished.
//!
//! Model layout under `models/{name}/`:
//!
//! | File | Required |
//! |------|----------|
//! | `model.onnx` | yes |
//! | `tokens.txt` | yes |
//! | `lexicon.txt` | no |
//! | `dict/` | no |

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use sherpa_rs::tts::{VitsTts, VitsTtsConfig};
use thiserror::Error;

use crate::config::TtsConfig;

// ---------------------------------------------------------------------------
// TtsError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum TtsError {
    #[error("voice model not found: {0}")]
    ModelNotFound(String),

    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("audio playback failed: {0}")]
    Playback(String),

    #[error("speech worker is not running")]
    WorkerGone,
}

// ---------------------------------------------------------------------------
// Text preparation
// ---------------------------------------------------------------------------

/// Strip markdown decoration and collapse whitespace so the voice does not
/// read out asterisks and backticks from chat answers.
///
/// ```
/// use desk_chat::tts::normalize_for_speech;
///
/// assert_eq!(normalize_for_speech("**Hi**,\n\n`there`"), "Hi, there");
/// ```
pub fn normalize_for_speech(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(c, '*' | '`' | '#' | '_' | '>' | '|'))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// VitsVoice
// ---------------------------------------------------------------------------

/// Resolved model files for one VITS voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceFiles {
    pub model: PathBuf,
    pub tokens: PathBuf,
    pub lexicon: Option<PathBuf>,
    pub dict_dir: Option<PathBuf>,
}

impl VoiceFiles {
    /// Locate the voice files inside `dir`.
    pub fn in_dir(dir: &Path) -> Result<Self, TtsError> {
        let model = dir.join("model.onnx");
        let tokens = dir.join("tokens.txt");
        for required in [&model, &tokens] {
            if !required.exists() {
                return Err(TtsError::ModelNotFound(required.display().to_string()));
            }
        }
        let lexicon = Some(dir.join("lexicon.txt")).filter(|p| p.exists());
        let dict_dir = Some(dir.join("dict")).filter(|p| p.is_dir());
        Ok(Self {
            model,
            tokens,
            lexicon,
            dict_dir,
        })
    }
}

fn path_string(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

/// A loaded VITS voice. Not `Send`; only used on the worker thread.
struct VitsVoice {
    tts: VitsTts,
    speaker_id: i32,
    speed: f32,
}

impl VitsVoice {
    fn load(files: &VoiceFiles, config: &TtsConfig) -> Self {
        log::info!("loading VITS voice from {}", files.model.display());
        let vits_config = VitsTtsConfig {
            model: files.model.display().to_string(),
            tokens: files.tokens.display().to_string(),
            lexicon: path_string(&files.lexicon),
            dict_dir: path_string(&files.dict_dir),
            ..Default::default()
        };
        Self {
            tts: VitsTts::new(vits_config),
            speaker_id: config.speaker_id,
            speed: config.speed,
        }
    }

    fn synthesize(&mut self, text: &str) -> Result<(Vec<f32>, u32), TtsError> {
        let audio = self
            .tts
            .create(text, self.speaker_id, self.speed)
            .map_err(|e| TtsError::Synthesis(e.to_string()))?;
        Ok((audio.samples, audio.sample_rate as u32))
    }
}

/// Play mono samples on the default output device until they finish.
fn play_blocking(samples: Vec<f32>, sample_rate: u32) -> Result<(), TtsError> {
    let (_stream, handle) =
        rodio::OutputStream::try_default().map_err(|e| TtsError::Playback(e.to_string()))?;
    let sink = rodio::Sink::try_new(&handle).map_err(|e| TtsError::Playback(e.to_string()))?;
    sink.append(rodio::buffer::SamplesBuffer::new(1, sample_rate, samples));
    sink.sleep_until_end();
    Ok(())
}

// ---------------------------------------------------------------------------
// TtsWorker
// ---------------------------------------------------------------------------

struct SpeakJob {
    text: String,
    reply: mpsc::Sender<Result<(), TtsError>>,
}

/// Handle to the read-aloud thread.
pub struct TtsWorker {
    jobs: mpsc::Sender<SpeakJob>,
}

impl TtsWorker {
    /// Check the voice files and start the worker thread.
    ///
    /// Missing files are reported here, before any thread is spawned.
    pub fn spawn(model_dir: &Path, config: &TtsConfig) -> Result<Self, TtsError> {
        let files = VoiceFiles::in_dir(model_dir)?;
        let config = config.clone();
        let (jobs, rx) = mpsc::channel::<SpeakJob>();

        thread::Builder::new()
            .name("tts-worker".into())
            .spawn(move || {
                let mut voice = VitsVoice::load(&files, &config);
                log::info!("tts worker ready");
                while let Ok(job) = rx.recv() {
                    let result = voice
                        .synthesize(&job.text)
                        .and_then(|(samples, rate)| play_blocking(samples, rate));
                    if let Err(e) = &result {
                        log::warn!("tts: {e}");
                    }
                    let _ = job.reply.send(result);
                }
                log::info!("tts worker shutting down");
            })
            .map_err(|e| TtsError::Synthesis(format!("cannot start tts thread: {e}")))?;

        Ok(Self { jobs })
    }

    /// Speak `text` and wait until playback ends. Blank text is a no-op.
    pub fn speak(&self, text: &str) -> Result<(), TtsError> {
        let text = normalize_for_speech(text);
        if text.is_empty() {
            return Ok(());
        }
        let (reply, done) = mpsc::channel();
        self.jobs
            .send(SpeakJob { text, reply })
            .map_err(|_| TtsError::WorkerGone)?;
        done.recv().map_err(|_| TtsError::WorkerGone)?
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_for_speech("  a \n\t b  "), "a b");
    }

    #[test]
    fn normalize_strips_markdown() {
        assert_eq!(normalize_for_speech("# Title\n> quote `code`"), "Title quote code");
    }

    #[test]
    fn normalize_keeps_cjk() {
        assert_eq!(normalize_for_speech("你好，**世界**"), "你好，世界");
    }

    #[test]
    fn voice_files_require_model_and_tokens() {
        let dir = tempdir().expect("temp dir");
        let err = VoiceFiles::in_dir(dir.path()).unwrap_err();
        assert!(matches!(err, TtsError::ModelNotFound(p) if p.ends_with("model.onnx")));

        std::fs::write(dir.path().join("model.onnx"), b"").expect("write");
        let err = VoiceFiles::in_dir(dir.path()).unwrap_err();
        assert!(matches!(err, TtsError::ModelNotFound(p) if p.ends_with("tokens.txt")));
    }

    #[test]
    fn voice_files_pick_up_optional_parts() {
        let dir = tempdir().expect("temp dir");
        std::fs::write(dir.path().join("model.onnx"), b"").expect("write");
        std::fs::write(dir.path().join("tokens.txt"), b"").expect("write");

        let files = VoiceFiles::in_dir(dir.path()).expect("files");
        assert!(files.lexicon.is_none());
        assert!(files.dict_dir.is_none());

        std::fs::write(dir.path().join("lexicon.txt"), b"").expect("write");
        std::fs::create_dir(dir.path().join("dict")).expect("mkdir");
        let files = VoiceFiles::in_dir(dir.path()).expect("files");
        assert_eq!(files.lexicon, Some(dir.path().join("lexicon.txt")));
        assert_eq!(files.dict_dir, Some(dir.path().join("dict")));
    }

    #[test]
    fn spawn_without_model_fails_early() {
        let dir = tempdir().expect("temp dir");
        let result = TtsWorker::spawn(dir.path(), &TtsConfig::default());
        assert!(matches!(result, Err(TtsError::ModelNotFound(_))));
    }
}
