use crate::models;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChatForm {
    /// Client-generated id for local-first clients
    pub id: Option<Uuid>,
    #[validate(max_length = 255)]
    pub title: Option<String>,
    pub pinned: Option<bool>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatForm {
    pub fn into_chat(self, user_id: &str) -> models::Chat {
        let now = Utc::now();
        models::Chat {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            user_id: user_id.to_string(),
            title: self.title.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or(now),
            pinned: self.pinned.unwrap_or(false),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChatForm {
    #[validate(max_length = 255)]
    pub title: Option<String>,
    pub pinned: Option<bool>,
}

impl UpdateChatForm {
    pub fn apply(self, chat: &mut models::Chat) {
        if let Some(title) = self.title {
            chat.title = title;
        }
        if let Some(pinned) = self.pinned {
            chat.pinned = pinned;
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BranchForm {
    /// Last message position copied into the branch
    #[validate(minimum = 0)]
    pub position: i32,
    #[validate(max_length = 255)]
    pub title: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MessageForm {
    pub id: Option<Uuid>,
    #[validate(max_length = 200000)]
    pub content: String,
    pub role: models::Role,
    pub timestamp: Option<DateTime<Utc>>,
    #[validate(minimum = 0)]
    pub position: Option<i32>,
    #[validate(max_items = 20)]
    pub attachments: Option<Vec<models::Attachment>>,
}

impl MessageForm {
    pub fn into_message(self, chat_id: Uuid) -> models::Message {
        let now = Utc::now();
        models::Message {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            chat_id,
            content: self.content,
            role: self.role,
            timestamp: self.timestamp.unwrap_or(now),
            position: self.position,
            attachments: self.attachments.map(Json),
            created_at: now,
            updated_at: now,
            deleted: false,
        }
    }
}
