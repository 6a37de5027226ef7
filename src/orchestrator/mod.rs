//! Request orchestration between the window and the background work.
//!
//! ```text
//! ChatApp::update()  (UI thread, every frame)
//!        │ submit / start_voice_input / speak / clear / select_history
//!        ▼
//! Orchestrator ──spawn──▶ tokio runtime
//!        ▲                   ├─ CompletionClient::complete → HistoryStore::append
//!        │                   ├─ SpeechInput::capture_and_transcribe (blocking)
//!        │                   └─ SpeechOutput::speak (blocking)
//!        └──── poll(): try_recv on an unbounded mpsc ◀──┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use desk_chat::config::{AppConfig, RoleTable};
//! use desk_chat::credential::Credential;
//! use desk_chat::history::HistoryStore;
//! use desk_chat::llm::ApiCompletionClient;
//! use desk_chat::orchestrator::Orchestrator;
//! use desk_chat::speech::Unavailable;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let mut orchestrator = Orchestrator::new(
//!         tokio::runtime::Handle::current(),
//!         Arc::new(ApiCompletionClient::from_config(&config.llm)),
//!         HistoryStore::new("history.json"),
//!         RoleTable::from_pairs([("assistant", "You are a helpful assistant.")]),
//!         Arc::new(Unavailable::new("no microphone")),
//!         Arc::new(Unavailable::new("no voice")),
//!     );
//!     orchestrator.set_credential(Credential::parse("sk-...").unwrap());
//!
//!     orchestrator.submit("hello", "assistant").unwrap();
//!     orchestrator.settle().await;
//!     println!("{}", orchestrator.answer());
//! }
//! ```

pub mod runner;
pub mod state;

pub use runner::{Orchestrator, RequestOutcome, SubmitError};
pub use state::{Notice, OrchestratorEvent, RequestState, Status};
