//! `CompletionClient` trait and the HTTP implementation.
//!
//! `ApiCompletionClient` talks to any OpenAI-compatible
//! `/v1/chat/completions` endpoint. Connection details come from
//! [`LlmConfig`]; the key is passed per call so a key entered after startup
//! is picked up without rebuilding the client.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::config::LlmConfig;
use crate::credential::Credential;

/// How much of an error body is kept in [`UpstreamError::Status`].
const BODY_EXCERPT_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// UpstreamError
// ---------------------------------------------------------------------------

/// Every way a completion request can fail.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection, DNS, TLS or timeout failure.
    #[error("network error: {0}")]
    Network(String),

    /// The API rejected the key (HTTP 401/403).
    #[error("authentication rejected by the API (HTTP {0})")]
    Unauthorized(u16),

    /// Rate limit or exhausted quota (HTTP 429).
    #[error("rate limit or quota exceeded: {0}")]
    RateLimited(String),

    /// Any other non-success status.
    #[error("API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not the expected chat-completion JSON.
    #[error("malformed API response: {0}")]
    Malformed(String),

    /// The completion carried no text.
    #[error("API returned an empty completion")]
    EmptyResponse,
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            UpstreamError::Malformed(e.to_string())
        } else {
            UpstreamError::Network(e.to_string())
        }
    }
}

/// Map a non-success HTTP status (and its body) onto an [`UpstreamError`].
pub fn classify_status(status: StatusCode, body: &str) -> UpstreamError {
    let excerpt: String = body.trim().chars().take(BODY_EXCERPT_CHARS).collect();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            UpstreamError::Unauthorized(status.as_u16())
        }
        StatusCode::TOO_MANY_REQUESTS => UpstreamError::RateLimited(excerpt),
        _ => UpstreamError::Status {
            status: status.as_u16(),
            body: excerpt,
        },
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// One entry of the `messages` array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

/// Optional system instruction first, then the prompt as the only user turn.
///
/// An empty instruction is the same as none.
pub fn build_messages(prompt: &str, system_instruction: Option<&str>) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(instruction) = system_instruction.filter(|s| !s.is_empty()) {
        messages.push(ChatMessage {
            role: "system",
            content: instruction.to_string(),
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: prompt.to_string(),
    });
    messages
}

/// Pull `choices[0].message.content` out of a response body.
pub fn extract_content(json: &serde_json::Value) -> Result<String, UpstreamError> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| UpstreamError::Malformed("missing choices[0].message.content".into()))?
        .trim()
        .to_string();

    if content.is_empty() {
        return Err(UpstreamError::EmptyResponse);
    }
    Ok(content)
}

// ---------------------------------------------------------------------------
// CompletionClient trait
// ---------------------------------------------------------------------------

/// One prompt in, one completion out.
///
/// Implementors must be `Send + Sync` so they can sit behind
/// `Arc<dyn CompletionClient>` and be called from background tasks. Callers
/// wait for the full response, so this must never be awaited on the UI
/// thread.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        credential: &Credential,
    ) -> Result<String, UpstreamError>;
}

// ---------------------------------------------------------------------------
// ApiCompletionClient
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible chat-completions endpoint.
pub struct ApiCompletionClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl ApiCompletionClient {
    /// Build a client from config.
    ///
    /// A timeout is only applied when `timeout_secs` is set; otherwise the
    /// server decides when to give up.
    pub fn from_config(config: &LlmConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build().unwrap_or_else(|e| {
            log::warn!("falling back to default HTTP client: {e}");
            reqwest::Client::new()
        });

        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl CompletionClient for ApiCompletionClient {
    async fn complete(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        credential: &Credential,
    ) -> Result<String, UpstreamError> {
        let body = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: build_messages(prompt, system_instruction),
        };

        log::debug!(
            "completion: POST {} ({} messages)",
            self.endpoint(),
            body.messages.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(credential.expose())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;

        extract_content(&json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
