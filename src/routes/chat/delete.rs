use crate::db;
use crate::helpers::JsonResponse;
use crate::models;
use crate::routes::chat::owned_chat;
use actix_web::{delete, web, Responder, Result};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// DELETE /api/chats/{id}
/// Soft delete; the row stays for sync.
#[tracing::instrument(name = "Delete chat.", skip(pg_pool))]
#[delete("/{id}")]
pub async fn delete(
    user: web::ReqData<Arc<models::User>>,
    path: web::Path<Uuid>,
    pg_pool: web::Data<PgPool>,
) -> Result<impl Responder> {
    let chat = owned_chat(pg_pool.get_ref(), path.into_inner(), &user.id).await?;

    db::chat::soft_delete(pg_pool.get_ref(), chat.id)
        .await
        .map_err(JsonResponse::internal_server_error)
        .map(|_| {
            JsonResponse::<models::Chat>::build()
                .set_id(chat.id.to_string())
                .ok("Chat deleted")
        })
}
