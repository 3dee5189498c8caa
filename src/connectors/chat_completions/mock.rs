use super::{ChatCompletionsConnector, CompletionDelta, CompletionRequest, DeltaStream};
use crate::connectors::ConnectorError;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Mutex;
use std::time::Duration;

/// Replays a fixed list of deltas, optionally failing afterwards.
#[derive(Default)]
pub struct MockChatCompletionsConnector {
    pub deltas: Vec<CompletionDelta>,
    /// Emitted as a stream item after the deltas
    pub fail_with: Option<String>,
    /// Returned instead of a stream
    pub reject_with: Option<String>,
    pub delay: Option<Duration>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl MockChatCompletionsConnector {
    pub fn with_content(chunks: &[&str]) -> Self {
        Self {
            deltas: chunks
                .iter()
                .map(|chunk| CompletionDelta::Content(chunk.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing_after(chunks: &[&str], message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::with_content(chunks)
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ChatCompletionsConnector for MockChatCompletionsConnector {
    async fn stream_chat(&self, request: CompletionRequest) -> Result<DeltaStream, ConnectorError> {
        self.requests.lock().unwrap().push(request);

        if let Some(message) = &self.reject_with {
            return Err(ConnectorError::HttpError(message.clone()));
        }

        let deltas = self.deltas.clone();
        let fail_with = self.fail_with.clone();
        let delay = self.delay;

        let stream = async_stream::stream! {
            for delta in deltas {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(delta);
            }
            if let Some(message) = fail_with {
                yield Err(ConnectorError::HttpError(message));
            }
        };

        Ok(stream.boxed())
    }
}
