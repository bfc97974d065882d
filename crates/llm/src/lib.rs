//! Model capability: chat completion with tool calling, audio
//! transcription, and the per-ticket session registry.
//!
//! The engine consumes the [`ChatCapability`] trait; [`openai::OpenAiChatClient`]
//! is the production implementation for any OpenAI-compatible endpoint.

pub mod openai;
pub mod sessions;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

use types::{ChatOutcome, ChatRequest};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model endpoint request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model endpoint returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed completion payload: {0}")]
    MalformedResponse(String),
    #[error("invalid response json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Chat-style completion with automatic tool selection, plus audio
/// transcription. One implementation handle exists per ticket (see
/// [`sessions::SessionRegistry`]).
#[async_trait]
pub trait ChatCapability: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome, LlmError>;
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String, LlmError>;
}
