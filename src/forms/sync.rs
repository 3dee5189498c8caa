use crate::models;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use sqlx::types::Json;
use uuid::Uuid;

/// Client copies of chats, each with its messages.
#[derive(Serialize, Deserialize, Debug, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SyncForm {
    #[validate(max_items = 500)]
    #[validate]
    pub chats: Vec<SyncChat>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SyncChat {
    pub id: Uuid,
    #[validate(max_length = 255)]
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub parent_chat_id: Option<Uuid>,
    #[serde(default)]
    pub branch_ids: Vec<Uuid>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    #[validate]
    pub messages: Vec<SyncMessage>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SyncMessage {
    pub id: Uuid,
    #[validate(max_length = 200000)]
    pub content: String,
    pub role: models::Role,
    pub timestamp: DateTime<Utc>,
    pub position: Option<i32>,
    pub attachments: Option<Vec<models::Attachment>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted: bool,
}

impl SyncChat {
    pub fn to_chat(&self, user_id: &str) -> models::Chat {
        models::Chat {
            id: self.id,
            user_id: user_id.to_string(),
            title: self.title.clone(),
            timestamp: self.timestamp,
            parent_chat_id: self.parent_chat_id,
            branch_ids: self.branch_ids.clone(),
            pinned: self.pinned,
            deleted: self.deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl SyncMessage {
    pub fn to_message(&self, chat_id: Uuid) -> models::Message {
        models::Message {
            id: self.id,
            chat_id,
            content: self.content.clone(),
            role: self.role,
            timestamp: self.timestamp,
            position: self.position,
            attachments: self.attachments.clone().map(Json),
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted: self.deleted,
        }
    }
}
