use crate::models::PromptMessage;
use crate::services::stream_manager::StartStream;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;

#[derive(Serialize, Deserialize, Debug, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartStreamForm {
    #[validate(min_length = 1)]
    #[validate(max_length = 255)]
    pub chat_id: String,
    #[validate(min_length = 1)]
    #[validate(max_length = 255)]
    pub message_id: String,
    #[validate(min_length = 1)]
    #[validate(max_length = 255)]
    pub model_id: String,
    #[validate(min_items = 1)]
    pub messages: Vec<PromptMessage>,
    /// Caller's own provider key, kept only inside the stream record
    pub api_key: Option<String>,
}

impl StartStreamForm {
    pub fn into_start(self, user_id: &str) -> StartStream {
        StartStream {
            chat_id: self.chat_id,
            message_id: self.message_id,
            user_id: user_id.to_string(),
            model_id: self.model_id,
            messages: self.messages,
            api_key: self.api_key.filter(|key| !key.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_prompt_is_rejected() {
        let form: StartStreamForm = serde_json::from_str(
            r#"{"chatId":"c","messageId":"m","modelId":"x/y","messages":[]}"#,
        )
        .unwrap();
        assert!(form.validate().is_err());
    }

    #[test]
    fn blank_api_key_is_dropped() {
        let form: StartStreamForm = serde_json::from_str(
            r#"{"chatId":"c","messageId":"m","modelId":"x/y","apiKey":" ","messages":[{"role":"user","content":"hi"}]}"#,
        )
        .unwrap();
        assert!(form.validate().is_ok());
        let start = form.into_start("u1");
        assert_eq!(start.user_id, "u1");
        assert!(start.api_key.is_none());
    }
}
