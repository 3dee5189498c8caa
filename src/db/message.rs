use crate::models;
use sqlx::PgPool;
use tracing::Instrument;
use uuid::Uuid;

const MESSAGE_COLUMNS: &str =
    "id, chat_id, content, role, timestamp, position, attachments, created_at, updated_at, deleted";

pub async fn fetch_by_chat(pool: &PgPool, chat_id: Uuid) -> Result<Vec<models::Message>, String> {
    let query_span = tracing::info_span!("Fetch messages by chat", chat_id = %chat_id);
    sqlx::query_as::<_, models::Message>(&format!(
        r#"SELECT {} FROM messages
           WHERE chat_id = $1 AND deleted = FALSE
           ORDER BY position ASC NULLS LAST, timestamp ASC"#,
        MESSAGE_COLUMNS
    ))
    .bind(chat_id)
    .fetch_all(pool)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to fetch messages, error: {:?}", err);
        "Could not fetch messages".to_string()
    })
}

/// Message by id including soft-deleted rows, used by sync.
pub async fn fetch_any(pool: &PgPool, id: Uuid) -> Result<Option<models::Message>, String> {
    let query_span = tracing::info_span!("Fetch message including deleted", message_id = %id);
    sqlx::query_as::<_, models::Message>(&format!("SELECT {} FROM messages WHERE id = $1", MESSAGE_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .instrument(query_span)
        .await
        .map_err(|err| {
            tracing::error!("Failed to fetch message, error: {:?}", err);
            "Could not fetch message".to_string()
        })
}

pub async fn insert(pool: &PgPool, message: models::Message) -> Result<models::Message, String> {
    let query_span = tracing::info_span!("Saving new message into the database");
    sqlx::query_as::<_, models::Message>(&format!(
        r#"
        INSERT INTO messages (id, chat_id, content, role, timestamp, position, attachments, created_at, updated_at, deleted)
        VALUES ($1, $2, $3, $4, $5,
            COALESCE($6, (SELECT COALESCE(MAX(position), -1) + 1 FROM messages WHERE chat_id = $2)),
            $7, NOW(), NOW(), FALSE)
        RETURNING {}
        "#,
        MESSAGE_COLUMNS
    ))
    .bind(message.id)
    .bind(message.chat_id)
    .bind(&message.content)
    .bind(message.role.as_str())
    .bind(message.timestamp)
    .bind(message.position)
    .bind(&message.attachments)
    .fetch_one(pool)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to insert message: {:?}", err);
        "Failed to insert".to_string()
    })
}

/// Write a client copy as-is. Only rows in the same chat are overwritten.
pub async fn upsert(pool: &PgPool, message: &models::Message) -> Result<Option<models::Message>, String> {
    let query_span = tracing::info_span!("Upserting synced message", message_id = %message.id);
    sqlx::query_as::<_, models::Message>(&format!(
        r#"
        INSERT INTO messages (id, chat_id, content, role, timestamp, position, attachments, created_at, updated_at, deleted)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (id) DO UPDATE SET
            content = EXCLUDED.content,
            role = EXCLUDED.role,
            timestamp = EXCLUDED.timestamp,
            position = EXCLUDED.position,
            attachments = EXCLUDED.attachments,
            updated_at = EXCLUDED.updated_at,
            deleted = EXCLUDED.deleted
        WHERE messages.chat_id = EXCLUDED.chat_id
        RETURNING {}
        "#,
        MESSAGE_COLUMNS
    ))
    .bind(message.id)
    .bind(message.chat_id)
    .bind(&message.content)
    .bind(message.role.as_str())
    .bind(message.timestamp)
    .bind(message.position)
    .bind(&message.attachments)
    .bind(message.created_at)
    .bind(message.updated_at)
    .bind(message.deleted)
    .fetch_optional(pool)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to upsert message: {:?}", err);
        "Failed to sync message".to_string()
    })
}

pub async fn soft_delete(pool: &PgPool, chat_id: Uuid, id: Uuid) -> Result<bool, String> {
    let query_span = tracing::info_span!("Soft deleting message", message_id = %id);
    sqlx::query(
        "UPDATE messages SET deleted = TRUE, updated_at = NOW() WHERE id = $1 AND chat_id = $2 AND deleted = FALSE",
    )
    .bind(id)
    .bind(chat_id)
    .execute(pool)
    .instrument(query_span)
    .await
    .map(|result| result.rows_affected() > 0)
    .map_err(|err| {
        tracing::error!("Failed to delete message: {:?}", err);
        "Failed to delete".to_string()
    })
}

/// Bump the owning chat's `updated_at` after a message change.
pub async fn touch_chat(pool: &PgPool, chat_id: Uuid) -> Result<(), String> {
    sqlx::query("UPDATE chats SET updated_at = NOW() WHERE id = $1")
        .bind(chat_id)
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(|err| {
            tracing::error!("Failed to touch chat: {:?}", err);
            "Failed to update chat".to_string()
        })
}
