use super::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Streaming,
    Completed,
    Error,
    Cancelled,
}

impl StreamStatus {
    /// Terminal states accept no further model output.
    pub fn is_terminal(self) -> bool {
        !matches!(self, StreamStatus::Streaming)
    }
}

impl Default for StreamStatus {
    fn default() -> Self {
        StreamStatus::Streaming
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StreamStatus::Streaming => "streaming",
            StreamStatus::Completed => "completed",
            StreamStatus::Error => "error",
            StreamStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// One turn of the conversation sent upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

/// Persisted record of a single generation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamState {
    pub stream_id: String,
    pub chat_id: String,
    pub message_id: String,
    pub user_id: String,
    pub model_id: String,
    pub messages: Vec<PromptMessage>,
    pub content: String,
    pub status: StreamStatus,
    pub start_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub position: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl StreamState {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Client-safe projection of a [`StreamState`]: no prompt, no key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatusView {
    pub exists: bool,
    pub status: Option<StreamStatus>,
    pub content: String,
    pub position: u64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Body of a successful start request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStarted {
    pub stream_id: String,
}

impl From<Option<StreamState>> for StreamStatusView {
    fn from(state: Option<StreamState>) -> Self {
        match state {
            Some(state) => StreamStatusView {
                exists: true,
                status: Some(state.status),
                content: state.content,
                position: state.position,
                last_activity: Some(state.last_activity),
            },
            None => StreamStatusView::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_streaming_is_not_terminal() {
        assert!(!StreamStatus::Streaming.is_terminal());
        assert!(StreamStatus::Completed.is_terminal());
        assert!(StreamStatus::Error.is_terminal());
        assert!(StreamStatus::Cancelled.is_terminal());
    }

    #[test]
    fn state_serializes_camel_case_without_missing_key() {
        let now = Utc::now();
        let state = StreamState {
            stream_id: "s1".to_string(),
            chat_id: "c1".to_string(),
            message_id: "m1".to_string(),
            user_id: "u1".to_string(),
            model_id: "openai/gpt-4o".to_string(),
            messages: vec![PromptMessage {
                role: Role::User,
                content: "hi".to_string(),
            }],
            content: String::new(),
            status: StreamStatus::Streaming,
            start_time: now,
            last_activity: now,
            position: 0,
            api_key: None,
        };

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["streamId"], "s1");
        assert_eq!(json["status"], "streaming");
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("apiKey").is_none());
    }

    #[test]
    fn status_view_hides_prompt_and_key() {
        let view = StreamStatusView::from(None);
        assert!(!view.exists);
        assert!(view.status.is_none());

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("apiKey").is_none());
        assert!(json.get("messages").is_none());
    }
}
