//! desk-chat: a desktop chat assistant with voice input and read-aloud.
//!
//! | Module | Role |
//! |--------|------|
//! | [`orchestrator`] | single-slot request state machine |
//! | [`llm`] | chat-completion client |
//! | [`history`] | append-only question/answer log |
//! | [`credential`] | API key storage and entry |
//! | [`config`] | settings, paths, role table |
//! | [`audio`], [`stt`], [`tts`], [`speech`] | voice bridges |
//! | [`app`] | egui window |
//! | [`error`] | failure classification |

pub mod app;
pub mod audio;
pub mod config;
pub mod credential;
pub mod error;
pub mod history;
pub mod llm;
pub mod orchestrator;
pub mod speech;
pub mod stt;
pub mod tts;
