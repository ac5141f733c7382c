//! Vibelink LLM - Streaming chat providers for the assistant.
//!
//! A [`ChatProvider`] takes an ordered message list, streams incremental
//! text deltas through an unbounded channel, and resolves with optional
//! usage metadata. Two implementations exist:
//!
//! - [`GeminiProvider`] - the Google Generative Language API over SSE
//! - [`MockProvider`] - a scriptable offline stand-in used when no API key
//!   is configured, and by the orchestration tests

pub mod gemini;
pub mod mock;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use vibelink_core::protocol::{PromptContext, Usage};

pub use gemini::{GeminiProvider, DEFAULT_MODEL};
pub use mock::{MockProvider, MockTurn};
pub use prompt::{build_prompt, PromptParts};

/// A single turn in the conversation. Order is semantically meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Conversation role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Result of one completed chat invocation.
#[derive(Debug, Clone, Default)]
pub struct ChatResult {
    /// Usage metadata, when the backend reports it.
    pub usage: Option<Usage>,
}

/// Channel end through which a provider streams incremental text.
///
/// Send failures mean the consumer went away; providers ignore them and
/// keep draining the backend stream so usage metadata is still collected.
pub type DeltaSender = UnboundedSender<String>;

/// Errors from a chat invocation.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure (connect, TLS, timeout, body read).
    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The backend answered with a non-success status.
    #[error("chat backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The stream carried a payload we could not interpret.
    #[error("malformed stream event: {0}")]
    Stream(String),
}

/// A streaming chat backend.
///
/// Implementations must be cheap to share (`Arc<dyn ChatProvider>`); every
/// query invokes `chat` with a fresh delta channel.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider label used in terminal-frame metadata (e.g. "Google").
    fn name(&self) -> &str;

    /// Model used when neither the query nor its context overrides it.
    fn default_model(&self) -> &str;

    /// Run one chat round: stream deltas through `deltas`, resolve with
    /// usage. Dropping `deltas` signals end-of-stream to the consumer.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        deltas: DeltaSender,
        context: Option<&PromptContext>,
    ) -> Result<ChatResult, LlmError>;
}
