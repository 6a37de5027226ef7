//! Chat-completion client.
//!
//! * [`CompletionClient`]: async trait every backend implements.
//! * [`ApiCompletionClient`]: OpenAI-compatible REST backend.
//! * [`UpstreamError`]: classified request failures.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use desk_chat::config::AppConfig;
//! use desk_chat::credential::Credential;
//! use desk_chat::llm::{ApiCompletionClient, CompletionClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client = ApiCompletionClient::from_config(&config.llm);
//!     let key = Credential::parse("sk-...").unwrap();
//!
//!     let answer = client
//!         .complete("What is Rust?", Some("Answer in one sentence."), &key)
//!         .await
//!         .unwrap();
//!     println!("{answer}");
//! }
//! ```

pub mod completion;

pub use completion::{
    build_messages, classify_status, extract_content, ApiCompletionClient, ChatMessage,
    CompletionClient, UpstreamError,
};
