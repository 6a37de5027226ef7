//! Main window (egui/eframe).
//!
//! [`ChatApp`] owns the [`Orchestrator`] and calls [`Orchestrator::poll`]
//! once per frame. Everything it draws comes from the orchestrator's
//! accessors; the only state kept here is what the user is typing.
//!
//! # Layout
//!
//! ```text
//! ┌ role ▾ ─────────────────────────── theme ┐
//! │ Question                     │ History    │
//! │ [                          ] │ [time] q…  │
//! │ Send  Clear  Voice  Speak    │ [time] q…  │
//! │ Answer                       │            │
//! │ [                          ] │            │
//! ├ Status: Waiting ─────────────┴────────────┤
//! ```
//!
//! Without a saved API key the window first shows a key-entry screen.
//! Declining it closes the window and sets the shared `declined` flag so
//! `main` can exit with an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eframe::egui;

use crate::config::{AppConfig, AppPaths, Theme};
use crate::credential::{CredentialPrompt, CredentialStore, PromptState};
use crate::orchestrator::{Orchestrator, OrchestratorEvent, SubmitError};

/// Visuals for a theme.
pub fn visuals_for(theme: Theme) -> egui::Visuals {
    match theme {
        Theme::Light => egui::Visuals::light(),
        Theme::Dark => egui::Visuals::dark(),
    }
}

// ---------------------------------------------------------------------------
// ChatApp
// ---------------------------------------------------------------------------

pub struct ChatApp {
    orchestrator: Orchestrator,
    prompt: Option<CredentialPrompt>,
    declined: Arc<AtomicBool>,

    config: AppConfig,
    paths: AppPaths,

    key_input: String,
    input: String,
    role: String,
    last_notice: Option<String>,
}

impl ChatApp {
    /// * `prompt`: `Some` when no valid key was found at startup.
    /// * `paths`: where the theme choice and a late API key are saved.
    /// * `declined`: set when the user refuses to enter a key.
    pub fn new(
        orchestrator: Orchestrator,
        prompt: Option<CredentialPrompt>,
        config: AppConfig,
        paths: AppPaths,
        declined: Arc<AtomicBool>,
    ) -> Self {
        let role = orchestrator.roles().first().unwrap_or_default().to_string();
        Self {
            orchestrator,
            prompt,
            declined,
            config,
            paths,
            key_input: String::new(),
            input: String::new(),
            role,
            last_notice: None,
        }
    }

    pub fn apply_theme(&self, ctx: &egui::Context) {
        ctx.set_visuals(visuals_for(self.config.ui.theme));
    }

    fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.config.ui.theme = self.config.ui.theme.toggled();
        self.apply_theme(ctx);
        if let Err(e) = self.config.save_to(&self.paths.settings_file) {
            log::warn!("could not save theme choice: {e}");
        }
    }

    // ── Outcomes ─────────────────────────────────────────────────────────

    fn handle_events(&mut self) {
        let events = self.orchestrator.poll();
        if events.is_empty() {
            return;
        }

        // A new outcome replaces the old notice; notices from the same batch
        // are picked up below.
        let finished = events.iter().any(|event| {
            matches!(
                event,
                OrchestratorEvent::AnswerReady(_) | OrchestratorEvent::RequestFailed(_)
            )
        });
        if finished {
            self.last_notice = None;
        }

        for event in events {
            if let OrchestratorEvent::TranscriptReady(text) = event {
                self.input = text;
            }
        }

        if let Some(notice) = self.orchestrator.take_notices().pop() {
            self.last_notice = Some(format!("{}: {}", notice.kind, notice.message));
        }
    }

    fn send(&mut self) {
        match self.orchestrator.submit(&self.input, &self.role) {
            Ok(()) => {}
            Err(SubmitError::CredentialMissing) => {
                log::warn!("no API key; asking for one");
                let store = CredentialStore::new(&self.paths.credential_file);
                self.prompt = Some(CredentialPrompt::new(store));
            }
            Err(e) => log::debug!("submit rejected: {e}"),
        }
    }

    // ── Key entry ────────────────────────────────────────────────────────

    fn draw_key_entry(&mut self, ctx: &egui::Context) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };

        let mut accepted = None;
        let mut declined = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(120.0);
                ui.heading("Enter your API key");
                ui.label("The key is stored locally and only sent to the chat API.");
                ui.add_space(8.0);

                let field = ui.add(
                    egui::TextEdit::singleline(&mut self.key_input)
                        .password(true)
                        .hint_text("sk-...")
                        .desired_width(360.0),
                );

                if let PromptState::Asking { error: Some(error) } = prompt.state() {
                    ui.colored_label(ui.visuals().error_fg_color, error);
                }

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    let submit = ui.button("Save").clicked()
                        || (field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)));
                    if submit {
                        match prompt.submit(&self.key_input) {
                            Ok(credential) => accepted = Some(credential),
                            Err(e) => log::warn!("API key rejected: {e}"),
                        }
                    }
                    if ui.button("Quit").clicked() {
                        prompt.decline();
                        declined = true;
                    }
                });
            });
        });

        if let Some(credential) = accepted {
            log::info!("API key saved");
            self.orchestrator.set_credential(credential);
            self.prompt = None;
            self.key_input.clear();
        }
        if declined {
            self.declined.store(true, Ordering::SeqCst);
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    // ── Chat screen ──────────────────────────────────────────────────────

    fn draw_top_bar(&mut self, ctx: &egui::Context) {
        let roles: Vec<String> = self.orchestrator.roles().names().map(str::to_string).collect();
        let mut toggle = false;

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                egui::ComboBox::from_label("Role")
                    .selected_text(self.role.as_str())
                    .show_ui(ui, |ui| {
                        for name in &roles {
                            ui.selectable_value(&mut self.role, name.clone(), name.as_str());
                        }
                    });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let label = match self.config.ui.theme {
                        Theme::Light => "Dark theme",
                        Theme::Dark => "Light theme",
                    };
                    toggle = ui.button(label).clicked();
                });
            });
        });

        if toggle {
            self.toggle_theme(ctx);
        }
    }

    fn draw_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!("Status: {}", self.orchestrator.status()));
                if let Some(notice) = &self.last_notice {
                    ui.separator();
                    ui.colored_label(ui.visuals().warn_fg_color, notice);
                }
            });
        });
    }

    fn draw_history(&mut self, ctx: &egui::Context) {
        let summaries: Vec<String> = self
            .orchestrator
            .history()
            .iter()
            .map(|record| record.summary())
            .collect();
        let mut clicked = None;

        egui::SidePanel::right("history")
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("History");
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for (i, summary) in summaries.iter().enumerate() {
                        if ui.selectable_label(false, summary).clicked() {
                            clicked = Some(i);
                        }
                    }
                });
            });

        if let Some(record) = clicked.and_then(|i| self.orchestrator.select_history(i)) {
            self.input = record.question;
        }
    }

    fn draw_main(&mut self, ctx: &egui::Context) {
        let mut send = false;
        let mut clear = false;
        let mut voice = false;
        let mut speak = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.label("Question");
            ui.add(
                egui::TextEdit::multiline(&mut self.input)
                    .desired_rows(6)
                    .desired_width(f32::INFINITY),
            );

            ui.horizontal(|ui| {
                let label = if self.orchestrator.is_busy() { "Sending…" } else { "Send" };
                send = ui
                    .add_enabled(!self.orchestrator.is_busy(), egui::Button::new(label))
                    .clicked();
                clear = ui.button("Clear").clicked();
                voice = ui
                    .add_enabled(!self.orchestrator.is_listening(), egui::Button::new("Voice input"))
                    .clicked();
                speak = ui
                    .add_enabled(!self.orchestrator.is_speaking(), egui::Button::new("Read aloud"))
                    .clicked();
            });

            ui.add_space(8.0);
            ui.label("Answer");
            let mut answer = self.orchestrator.answer();
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add(
                    egui::TextEdit::multiline(&mut answer)
                        .desired_rows(12)
                        .desired_width(f32::INFINITY),
                );
            });
        });

        if send {
            self.send();
        }
        if clear {
            self.input.clear();
            self.orchestrator.clear();
            self.last_notice = None;
        }
        if voice {
            if let Err(e) = self.orchestrator.start_voice_input() {
                log::debug!("voice input rejected: {e}");
            }
        }
        if speak {
            let text = self.orchestrator.answer().to_string();
            if let Err(e) = self.orchestrator.speak(&text) {
                log::debug!("read-aloud rejected: {e}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_events();

        if self.orchestrator.is_busy()
            || self.orchestrator.is_listening()
            || self.orchestrator.is_speaking()
        {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        if self.prompt.is_some() {
            self.draw_key_entry(ctx);
            return;
        }

        self.draw_top_bar(ctx);
        self.draw_status_bar(ctx);
        self.draw_history(ctx);
        self.draw_main(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("desk-chat window closing");
    }
}
