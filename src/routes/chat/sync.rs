use crate::db;
use crate::forms;
use crate::helpers::JsonResponse;
use crate::models;
use crate::services::sync::should_upload;
use actix_web::{post, web, Responder, Result};
use serde_valid::Validate;
use sqlx::PgPool;
use std::sync::Arc;

/// POST /api/chats/sync
/// Each client copy replaces the server copy only when it is strictly newer.
/// Responds with the server state of every chat that was sent.
#[tracing::instrument(name = "Sync chats.", skip(form, pg_pool))]
#[post("/sync")]
pub async fn sync(
    user: web::ReqData<Arc<models::User>>,
    form: web::Json<forms::SyncForm>,
    pg_pool: web::Data<PgPool>,
) -> Result<impl Responder> {
    if let Err(errors) = form.validate() {
        return Err(JsonResponse::<models::ChatWithMessages>::build().form_error(errors.to_string()));
    }

    let pool = pg_pool.get_ref();
    let mut merged = Vec::with_capacity(form.chats.len());
    let mut uploaded = 0usize;

    for local in form.into_inner().chats {
        let chat = local.to_chat(&user.id);
        let remote = db::chat::fetch_any(pool, chat.id)
            .await
            .map_err(JsonResponse::internal_server_error)?;

        if let Some(remote) = &remote {
            if remote.user_id != user.id {
                tracing::warn!(chat_id = %chat.id, "Skipping sync of a chat owned by another user");
                continue;
            }
        }

        if should_upload(&chat, remote.as_ref()) {
            db::chat::upsert(pool, &chat)
                .await
                .map_err(JsonResponse::internal_server_error)?;
            uploaded += 1;
        }

        for local_message in &local.messages {
            let message = local_message.to_message(chat.id);
            let remote = db::message::fetch_any(pool, message.id)
                .await
                .map_err(JsonResponse::internal_server_error)?;

            if remote.as_ref().map_or(false, |remote| remote.chat_id != chat.id) {
                continue;
            }
            if should_upload(&message, remote.as_ref()) {
                db::message::upsert(pool, &message)
                    .await
                    .map_err(JsonResponse::internal_server_error)?;
                uploaded += 1;
            }
        }

        if let Some(chat) = db::chat::fetch_any(pool, chat.id)
            .await
            .map_err(JsonResponse::internal_server_error)?
        {
            let messages = db::message::fetch_by_chat(pool, chat.id)
                .await
                .map_err(JsonResponse::internal_server_error)?;
            merged.push(models::ChatWithMessages { chat, messages });
        }
    }

    tracing::info!(uploaded, chats = merged.len(), "Chats synced");

    Ok(JsonResponse::<models::ChatWithMessages>::build()
        .set_list(merged)
        .ok(format!("{} records uploaded", uploaded)))
}
