use crate::models;
use sqlx::PgPool;
use tracing::Instrument;
use uuid::Uuid;

const CHAT_COLUMNS: &str = "id, user_id, title, timestamp, parent_chat_id, branch_ids, pinned, deleted, created_at, updated_at";

/// Live chat by id, regardless of owner.
pub async fn fetch(pool: &PgPool, id: Uuid) -> Result<Option<models::Chat>, String> {
    let query_span = tracing::info_span!("Fetch chat by id", chat_id = %id);
    sqlx::query_as::<_, models::Chat>(&format!(
        "SELECT {} FROM chats WHERE id = $1 AND deleted = FALSE",
        CHAT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to fetch chat, error: {:?}", err);
        "Could not fetch chat".to_string()
    })
}

/// Chat by id including soft-deleted rows, used by sync.
pub async fn fetch_any(pool: &PgPool, id: Uuid) -> Result<Option<models::Chat>, String> {
    let query_span = tracing::info_span!("Fetch chat including deleted", chat_id = %id);
    sqlx::query_as::<_, models::Chat>(&format!("SELECT {} FROM chats WHERE id = $1", CHAT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .instrument(query_span)
        .await
        .map_err(|err| {
            tracing::error!("Failed to fetch chat, error: {:?}", err);
            "Could not fetch chat".to_string()
        })
}

pub async fn fetch_by_user(pool: &PgPool, user_id: &str) -> Result<Vec<models::Chat>, String> {
    let query_span = tracing::info_span!("Fetch chats by user", user_id = user_id);
    sqlx::query_as::<_, models::Chat>(&format!(
        "SELECT {} FROM chats WHERE user_id = $1 AND deleted = FALSE ORDER BY pinned DESC, updated_at DESC",
        CHAT_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to fetch chats, error: {:?}", err);
        "Could not fetch chats".to_string()
    })
}

pub async fn insert(pool: &PgPool, chat: models::Chat) -> Result<models::Chat, String> {
    let query_span = tracing::info_span!("Saving new chat into the database");
    sqlx::query_as::<_, models::Chat>(&format!(
        r#"
        INSERT INTO chats (id, user_id, title, timestamp, parent_chat_id, branch_ids, pinned, deleted, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, NOW(), NOW())
        RETURNING {}
        "#,
        CHAT_COLUMNS
    ))
    .bind(chat.id)
    .bind(&chat.user_id)
    .bind(&chat.title)
    .bind(chat.timestamp)
    .bind(chat.parent_chat_id)
    .bind(&chat.branch_ids)
    .bind(chat.pinned)
    .fetch_one(pool)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to insert chat: {:?}", err);
        "Failed to insert".to_string()
    })
}

pub async fn update(pool: &PgPool, chat: models::Chat) -> Result<models::Chat, String> {
    let query_span = tracing::info_span!("Updating chat", chat_id = %chat.id);
    sqlx::query_as::<_, models::Chat>(&format!(
        r#"
        UPDATE chats SET title = $2, pinned = $3, timestamp = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        CHAT_COLUMNS
    ))
    .bind(chat.id)
    .bind(&chat.title)
    .bind(chat.pinned)
    .bind(chat.timestamp)
    .fetch_one(pool)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to update chat: {:?}", err);
        "Failed to update".to_string()
    })
}

/// Write a client copy as-is, keeping its timestamps. Rows owned by another
/// user are never overwritten.
pub async fn upsert(pool: &PgPool, chat: &models::Chat) -> Result<Option<models::Chat>, String> {
    let query_span = tracing::info_span!("Upserting synced chat", chat_id = %chat.id);
    sqlx::query_as::<_, models::Chat>(&format!(
        r#"
        INSERT INTO chats (id, user_id, title, timestamp, parent_chat_id, branch_ids, pinned, deleted, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (id) DO UPDATE SET
            title = EXCLUDED.title,
            timestamp = EXCLUDED.timestamp,
            parent_chat_id = EXCLUDED.parent_chat_id,
            branch_ids = EXCLUDED.branch_ids,
            pinned = EXCLUDED.pinned,
            deleted = EXCLUDED.deleted,
            updated_at = EXCLUDED.updated_at
        WHERE chats.user_id = EXCLUDED.user_id
        RETURNING {}
        "#,
        CHAT_COLUMNS
    ))
    .bind(chat.id)
    .bind(&chat.user_id)
    .bind(&chat.title)
    .bind(chat.timestamp)
    .bind(chat.parent_chat_id)
    .bind(&chat.branch_ids)
    .bind(chat.pinned)
    .bind(chat.deleted)
    .bind(chat.created_at)
    .bind(chat.updated_at)
    .fetch_optional(pool)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to upsert chat: {:?}", err);
        "Failed to sync chat".to_string()
    })
}

pub async fn soft_delete(pool: &PgPool, id: Uuid) -> Result<bool, String> {
    let query_span = tracing::info_span!("Soft deleting chat", chat_id = %id);
    sqlx::query("UPDATE chats SET deleted = TRUE, updated_at = NOW() WHERE id = $1 AND deleted = FALSE")
        .bind(id)
        .execute(pool)
        .instrument(query_span)
        .await
        .map(|result| result.rows_affected() > 0)
        .map_err(|err| {
            tracing::error!("Failed to delete chat: {:?}", err);
            "Failed to delete".to_string()
        })
}

/// Create `branch` as a child of `parent_id`, copying the parent's messages up
/// to and including `position`.
pub async fn create_branch(
    pool: &PgPool,
    parent_id: Uuid,
    branch: models::Chat,
    position: i32,
) -> Result<models::Chat, String> {
    let query_span = tracing::info_span!("Creating chat branch", parent_id = %parent_id, position);
    async move {
        let mut tx = pool.begin().await?;

        let created = sqlx::query_as::<_, models::Chat>(&format!(
            r#"
            INSERT INTO chats (id, user_id, title, timestamp, parent_chat_id, branch_ids, pinned, deleted, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), $4, '{{}}', FALSE, FALSE, NOW(), NOW())
            RETURNING {}
            "#,
            CHAT_COLUMNS
        ))
        .bind(branch.id)
        .bind(&branch.user_id)
        .bind(&branch.title)
        .bind(parent_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO messages (id, chat_id, content, role, timestamp, position, attachments, created_at, updated_at, deleted)
            SELECT gen_random_uuid(), $2, content, role, timestamp, position, attachments, NOW(), NOW(), FALSE
            FROM messages
            WHERE chat_id = $1 AND deleted = FALSE AND position IS NOT NULL AND position <= $3
            "#,
        )
        .bind(parent_id)
        .bind(created.id)
        .bind(position)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE chats SET branch_ids = array_append(branch_ids, $2), updated_at = NOW() WHERE id = $1",
        )
        .bind(parent_id)
        .bind(created.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok::<_, sqlx::Error>(created)
    }
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to create branch: {:?}", err);
        "Failed to create branch".to_string()
    })
}
