//! OpenAI-compatible chat completions connector.
//!
//! Routes and the generation task only see [`ChatCompletionsConnector`]; the
//! HTTP client lives in `client.rs` and a scripted double in `mock.rs`.

use crate::connectors::ConnectorError;
use crate::models::PromptMessage;
use async_trait::async_trait;
use futures::stream::BoxStream;

pub mod client;
#[cfg(test)]
pub mod mock;
mod sse;

pub use client::ChatCompletionsClient;
#[cfg(test)]
pub use mock::MockChatCompletionsConnector;
pub use sse::{parse_line, parse_payload, SseDecoder, SseEvent};

/// One incremental piece of a completion.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionDelta {
    Content(String),
    Reasoning(String),
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<PromptMessage>,
    /// Caller-supplied key, falls back to the server key when absent
    pub api_key: Option<String>,
}

pub type DeltaStream = BoxStream<'static, Result<CompletionDelta, ConnectorError>>;

#[async_trait]
pub trait ChatCompletionsConnector: Send + Sync {
    /// Open a streaming completion. Errors before the first byte are returned
    /// directly, errors mid-stream arrive as stream items.
    async fn stream_chat(&self, request: CompletionRequest) -> Result<DeltaStream, ConnectorError>;
}
