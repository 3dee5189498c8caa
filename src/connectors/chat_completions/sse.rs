//! Decoding of `text/event-stream` chat-completion chunks.

use super::CompletionDelta;
use crate::connectors::ConnectorError;
use serde::Deserialize;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    Data(String),
    Done,
}

/// Splits an arbitrary byte stream into SSE `data:` events.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(idx) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=idx).collect();
            // a full line never ends inside a multi-byte character
            if let Some(event) = parse_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buffer).to_string();
        self.buffer.clear();
        parse_line(&line)
    }
}

/// Comments (`:`), blank lines and non-data fields yield `None`.
pub fn parse_line(line: &str) -> Option<SseEvent> {
    let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();

    if payload.is_empty() {
        None
    } else if payload == DONE_SENTINEL {
        Some(SseEvent::Done)
    } else {
        Some(SseEvent::Data(payload.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
    reasoning: Option<String>,
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
    code: Option<serde_json::Value>,
}

/// Extract content and reasoning deltas from one `data:` payload.
pub fn parse_payload(payload: &str) -> Result<Vec<CompletionDelta>, ConnectorError> {
    let chunk: ChunkPayload = serde_json::from_str(payload)
        .map_err(|err| ConnectorError::InvalidResponse(format!("Invalid streaming chunk: {}", err)))?;

    if let Some(error) = chunk.error {
        let message = match error.code {
            Some(code) => format!("{} (code {})", error.message, code),
            None => error.message,
        };
        return Err(ConnectorError::HttpError(message));
    }

    let mut deltas = Vec::new();
    if let Some(choice) = chunk.choices.into_iter().next() {
        let reasoning = choice.delta.reasoning.or(choice.delta.reasoning_content);
        if let Some(reasoning) = reasoning.filter(|r| !r.is_empty()) {
            deltas.push(CompletionDelta::Reasoning(reasoning));
        }
        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            deltas.push(CompletionDelta::Content(content));
        }
    }

    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_classified() {
        assert_eq!(parse_line(": OPENROUTER PROCESSING"), None);
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("event: ping"), None);
        assert_eq!(parse_line("data: [DONE]\r\n"), Some(SseEvent::Done));
        assert_eq!(
            parse_line("data: {\"a\":1}"),
            Some(SseEvent::Data("{\"a\":1}".to_string()))
        );
    }

    #[test]
    fn decoder_handles_lines_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"choices\":[]").is_empty());

        let events = decoder.push(b"}\n\ndata: [DO");
        assert_eq!(events, vec![SseEvent::Data("{\"choices\":[]}".to_string())]);

        assert_eq!(decoder.push(b"NE]\n"), vec![SseEvent::Done]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn decoder_keeps_multibyte_characters_intact() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"héllo\"}}]}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xc3).unwrap() + 1;

        let mut decoder = SseDecoder::default();
        assert!(decoder.push(&line[..split]).is_empty());
        let events = decoder.push(&line[split..]);

        match &events[..] {
            [SseEvent::Data(payload)] => assert_eq!(
                parse_payload(payload).unwrap(),
                vec![CompletionDelta::Content("héllo".to_string())]
            ),
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[test]
    fn decoder_flushes_unterminated_line() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish(), Some(SseEvent::Done));
    }

    #[test]
    fn payload_yields_reasoning_then_content() {
        let deltas = parse_payload(
            r#"{"choices":[{"delta":{"reasoning":"think","content":"answer"}}]}"#,
        )
        .unwrap();
        assert_eq!(
            deltas,
            vec![
                CompletionDelta::Reasoning("think".to_string()),
                CompletionDelta::Content("answer".to_string()),
            ]
        );

        let deltas =
            parse_payload(r#"{"choices":[{"delta":{"reasoning_content":"r1"}}]}"#).unwrap();
        assert_eq!(deltas, vec![CompletionDelta::Reasoning("r1".to_string())]);
    }

    #[test]
    fn empty_and_role_only_deltas_are_skipped() {
        assert!(parse_payload(r#"{"choices":[{"delta":{"role":"assistant","content":""}}]}"#)
            .unwrap()
            .is_empty());
        assert!(parse_payload(r#"{"choices":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn provider_error_and_garbage_are_errors() {
        let err = parse_payload(r#"{"error":{"message":"overloaded","code":503}}"#).unwrap_err();
        assert_eq!(err.to_string(), "HTTP error: overloaded (code 503)");

        assert!(matches!(
            parse_payload("{not json"),
            Err(ConnectorError::InvalidResponse(_))
        ));
    }
}
