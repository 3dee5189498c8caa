use super::sse::{parse_payload, SseDecoder, SseEvent};
use super::{ChatCompletionsConnector, CompletionRequest, DeltaStream};
use crate::configuration::LlmSettings;
use crate::connectors::ConnectorError;
use crate::models::PromptMessage;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;
use tracing::Instrument;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP client for `POST {base_url}/chat/completions` with `stream: true`.
pub struct ChatCompletionsClient {
    endpoint: String,
    http_client: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    stream: bool,
}

impl ChatCompletionsClient {
    pub fn new(settings: &LlmSettings) -> Result<Self, ConnectorError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(settings.request_timeout())
            .build()
            .map_err(|err| ConnectorError::Internal(format!("Failed to create HTTP client: {}", err)))?;

        Ok(Self {
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            http_client,
            api_key: settings.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn resolve_key<'a>(&'a self, request: &'a CompletionRequest) -> Result<&'a str, ConnectorError> {
        request
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .or(self.api_key.as_deref())
            .ok_or_else(|| ConnectorError::Unauthorized("No API key configured".to_string()))
    }
}

#[async_trait]
impl ChatCompletionsConnector for ChatCompletionsClient {
    async fn stream_chat(&self, request: CompletionRequest) -> Result<DeltaStream, ConnectorError> {
        let api_key = self.resolve_key(&request)?;
        let body = ChatCompletionBody {
            model: &request.model,
            messages: &request.messages,
            stream: true,
        };

        let span = tracing::info_span!("chat_completions_request", model = %request.model);
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .instrument(span)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("Completion request rejected: {} {}", status, text);
            return Err(ConnectorError::from_status(status, &text));
        }

        let mut bytes = response.bytes_stream();
        let stream = async_stream::try_stream! {
            let mut decoder = SseDecoder::default();
            let mut done = false;

            while !done {
                let chunk = match bytes.next().await {
                    Some(chunk) => chunk?,
                    None => break,
                };
                for event in decoder.push(&chunk) {
                    match event {
                        SseEvent::Done => {
                            done = true;
                            break;
                        }
                        SseEvent::Data(payload) => {
                            for delta in parse_payload(&payload)? {
                                yield delta;
                            }
                        }
                    }
                }
            }

            if !done {
                if let Some(SseEvent::Data(payload)) = decoder.finish() {
                    for delta in parse_payload(&payload)? {
                        yield delta;
                    }
                }
            }
        };

        Ok(stream.boxed())
    }
}
