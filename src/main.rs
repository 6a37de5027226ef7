//! desk-chat binary.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Resolve [`AppPaths`] and load [`AppConfig`] (defaults on first run).
//! 3. Load the role table. A missing or broken `roles.json` is fatal.
//!    Install it by copying `assets/roles.json` into the config dir
//!    (`$DESK_CHAT_HOME`, or `<config dir>/desk-chat/`).
//! 4. Load the API key; without a valid one the window opens on key entry.
//! 5. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 6. Build the completion client and the voice bridges. Missing models
//!    only disable the matching button.
//! 7. Run [`eframe::run_native`] until the window is closed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use eframe::egui;

use desk_chat::{
    app::ChatApp,
    config::{AppConfig, AppPaths, RoleTable, SttConfig, TtsConfig},
    credential::{CredentialPrompt, CredentialStore},
    error::AssistantError,
    history::HistoryStore,
    llm::ApiCompletionClient,
    orchestrator::Orchestrator,
    speech::{MicrophoneInput, SpeechInput, SpeechOutput, Unavailable},
    stt::{self, TranscribeParams, WhisperEngine},
    tts::TtsWorker,
};

// ---------------------------------------------------------------------------
// Voice bridges
// ---------------------------------------------------------------------------

fn speech_input(paths: &AppPaths, config: &SttConfig) -> Arc<dyn SpeechInput> {
    if config.sample_rate != 16_000 {
        log::warn!(
            "stt.sample_rate = {} ignored; Whisper always receives 16 kHz",
            config.sample_rate
        );
    }

    let model_path = paths.models_dir.join(stt::model_file_name(&config.model));
    match WhisperEngine::load(&model_path, TranscribeParams::for_language(&config.language)) {
        Ok(engine) => {
            log::info!("Whisper model loaded: {}", model_path.display());
            let window = Duration::from_secs(u64::from(config.capture_secs));
            Arc::new(MicrophoneInput::new(Arc::new(engine), window))
        }
        Err(e) => {
            log::warn!("voice input disabled: {e}");
            Arc::new(Unavailable::new(format!("voice input unavailable: {e}")))
        }
    }
}

fn speech_output(paths: &AppPaths, config: &TtsConfig) -> Arc<dyn SpeechOutput> {
    let model_dir = paths.models_dir.join(&config.model);
    match TtsWorker::spawn(&model_dir, config) {
        Ok(worker) => {
            log::info!("VITS voice found: {}", model_dir.display());
            Arc::new(worker)
        }
        Err(e) => {
            log::warn!("read-aloud disabled: {e}");
            Arc::new(Unavailable::new(format!("read-aloud unavailable: {e}")))
        }
    }
}

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (width, height) = config.ui.window_size;
    let viewport = egui::ViewportBuilder::default()
        .with_title("Desk Chat")
        .with_inner_size([width, height])
        .with_min_inner_size([640.0, 400.0]);

    eframe::NativeOptions {
        viewport,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("desk-chat starting up");

    // 2. Paths and settings
    let paths = AppPaths::new();
    let config = AppConfig::load_from(&paths.settings_file).unwrap_or_else(|e| {
        log::warn!("Failed to load settings ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Roles
    let roles = RoleTable::load_from(&paths.roles_file).map_err(AssistantError::from)?;

    // 4. API key
    let credentials = CredentialStore::new(&paths.credential_file);
    let credential = credentials.load_valid();

    // 5. Tokio runtime (2 workers; voice jobs go to the blocking pool)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 6. Collaborators
    let client = Arc::new(ApiCompletionClient::from_config(&config.llm));
    let mut orchestrator = Orchestrator::new(
        rt.handle().clone(),
        client,
        HistoryStore::new(&paths.history_file),
        roles,
        speech_input(&paths, &config.stt),
        speech_output(&paths, &config.tts),
    );

    let prompt = match credential {
        Some(credential) => {
            orchestrator.set_credential(credential);
            None
        }
        None => {
            log::info!("no valid API key in {}", paths.credential_file.display());
            Some(CredentialPrompt::new(credentials))
        }
    };

    // 7. Window
    let declined = Arc::new(AtomicBool::new(false));
    let app = ChatApp::new(
        orchestrator,
        prompt,
        config.clone(),
        paths,
        Arc::clone(&declined),
    );

    eframe::run_native(
        "desk-chat",
        native_options(&config),
        Box::new(move |cc| {
            app.apply_theme(&cc.egui_ctx);
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("window error: {e}"))?;

    if declined.load(Ordering::SeqCst) {
        return Err(AssistantError::CredentialMissing.into());
    }

    log::info!("desk-chat exiting");
    Ok(())
}
