use crate::db;
use crate::helpers::JsonResponse;
use crate::models;
use crate::routes::chat::owned_chat;
use actix_web::{get, web, Responder, Result};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// GET /api/chats
#[tracing::instrument(name = "List chats.", skip(pg_pool))]
#[get("")]
pub async fn list(
    user: web::ReqData<Arc<models::User>>,
    pg_pool: web::Data<PgPool>,
) -> Result<impl Responder> {
    db::chat::fetch_by_user(pg_pool.get_ref(), &user.id)
        .await
        .map_err(JsonResponse::internal_server_error)
        .map(|chats| JsonResponse::build().set_list(chats).ok("OK"))
}

/// GET /api/chats/{id}
/// The chat with its live messages.
#[tracing::instrument(name = "Get chat.", skip(pg_pool))]
#[get("/{id}")]
pub async fn item(
    user: web::ReqData<Arc<models::User>>,
    path: web::Path<Uuid>,
    pg_pool: web::Data<PgPool>,
) -> Result<impl Responder> {
    let chat = owned_chat(pg_pool.get_ref(), path.into_inner(), &user.id).await?;
    let messages = db::message::fetch_by_chat(pg_pool.get_ref(), chat.id)
        .await
        .map_err(JsonResponse::internal_server_error)?;

    Ok(JsonResponse::build()
        .set_id(chat.id.to_string())
        .set_item(models::ChatWithMessages { chat, messages })
        .ok("OK"))
}
