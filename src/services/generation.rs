//! Drives one upstream completion into a stream record.

use super::stream_manager::StreamManager;
use crate::connectors::chat_completions::{
    ChatCompletionsConnector, CompletionDelta, CompletionRequest,
};
use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Concatenates deltas, wrapping consecutive reasoning deltas in a single
/// `<think>` block.
#[derive(Debug, Default)]
pub struct ContentAccumulator {
    content: String,
    in_reasoning: bool,
}

impl ContentAccumulator {
    pub fn push(&mut self, delta: &CompletionDelta) {
        match delta {
            CompletionDelta::Reasoning(text) => {
                if !self.in_reasoning {
                    self.content.push_str(THINK_OPEN);
                    self.in_reasoning = true;
                }
                self.content.push_str(text);
            }
            CompletionDelta::Content(text) => {
                self.close_reasoning();
                self.content.push_str(text);
            }
        }
    }

    /// Close an open reasoning block. Returns `true` if the content changed.
    pub fn close_reasoning(&mut self) -> bool {
        if self.in_reasoning {
            self.content.push_str(THINK_CLOSE);
            self.in_reasoning = false;
            return true;
        }
        false
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// How a generation run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Completed,
    /// The record went terminal (cancelled) or disappeared mid-run
    Stopped,
    Failed(String),
}

pub fn spawn_generation(
    manager: Arc<StreamManager>,
    connector: Arc<dyn ChatCompletionsConnector>,
    stream_id: String,
    request: CompletionRequest,
) -> JoinHandle<GenerationOutcome> {
    tokio::spawn(async move { run_generation(&manager, connector.as_ref(), &stream_id, request).await })
}

#[tracing::instrument(name = "Generate completion", skip(manager, connector, request), fields(model = %request.model))]
pub async fn run_generation(
    manager: &StreamManager,
    connector: &dyn ChatCompletionsConnector,
    stream_id: &str,
    request: CompletionRequest,
) -> GenerationOutcome {
    let mut deltas = match connector.stream_chat(request).await {
        Ok(deltas) => deltas,
        Err(err) => return fail(manager, stream_id, err.to_string()).await,
    };

    let mut accumulator = ContentAccumulator::default();
    let mut position: u64 = 0;

    while let Some(item) = deltas.next().await {
        match item {
            Ok(delta) => {
                accumulator.push(&delta);
                position += 1;
                if !persist(manager, stream_id, accumulator.content(), position).await {
                    tracing::info!("Stream is no longer active, stopping generation");
                    return GenerationOutcome::Stopped;
                }
            }
            Err(err) => return fail(manager, stream_id, err.to_string()).await,
        }
    }

    if accumulator.close_reasoning() {
        position += 1;
        if !persist(manager, stream_id, accumulator.content(), position).await {
            return GenerationOutcome::Stopped;
        }
    }

    match manager.complete_stream(stream_id).await {
        Ok(_) => {
            tracing::info!(chunks = position, "Generation completed");
            GenerationOutcome::Completed
        }
        Err(err) => {
            tracing::warn!("Failed to mark stream completed: {}", err);
            GenerationOutcome::Completed
        }
    }
}

/// Store errors are logged and treated as "keep going".
async fn persist(manager: &StreamManager, stream_id: &str, content: &str, position: u64) -> bool {
    match manager.update_stream_content(stream_id, content, position).await {
        Ok(active) => active,
        Err(err) => {
            tracing::warn!(position, "Failed to persist stream content: {}", err);
            true
        }
    }
}

async fn fail(manager: &StreamManager, stream_id: &str, message: String) -> GenerationOutcome {
    tracing::error!("Upstream completion failed: {}", message);
    if let Err(err) = manager.error_stream(stream_id, &message).await {
        tracing::warn!("Failed to record stream error: {}", err);
    }
    GenerationOutcome::Failed(message)
}
