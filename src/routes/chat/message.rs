use crate::db;
use crate::forms;
use crate::helpers::JsonResponse;
use crate::models;
use crate::routes::chat::owned_chat;
use actix_web::{delete, get, post, web, Responder, Result};
use serde_valid::Validate;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// POST /api/chats/{id}/messages
#[tracing::instrument(name = "Add message.", skip(form, pg_pool))]
#[post("/{id}/messages")]
pub async fn add_message(
    user: web::ReqData<Arc<models::User>>,
    path: web::Path<Uuid>,
    form: web::Json<forms::MessageForm>,
    pg_pool: web::Data<PgPool>,
) -> Result<impl Responder> {
    if let Err(errors) = form.validate() {
        return Err(JsonResponse::<models::Message>::build().form_error(errors.to_string()));
    }

    let chat = owned_chat(pg_pool.get_ref(), path.into_inner(), &user.id).await?;
    let message = form.into_inner().into_message(chat.id);

    let message = db::message::insert(pg_pool.get_ref(), message)
        .await
        .map_err(|err| JsonResponse::<models::Message>::build().internal_server_error(err))?;
    let _ = db::message::touch_chat(pg_pool.get_ref(), chat.id).await;

    Ok(JsonResponse::<models::Message>::build()
        .set_id(message.id.to_string())
        .set_item(message)
        .created("Message added"))
}

/// GET /api/chats/{id}/messages
#[tracing::instrument(name = "List messages.", skip(pg_pool))]
#[get("/{id}/messages")]
pub async fn list_messages(
    user: web::ReqData<Arc<models::User>>,
    path: web::Path<Uuid>,
    pg_pool: web::Data<PgPool>,
) -> Result<impl Responder> {
    let chat = owned_chat(pg_pool.get_ref(), path.into_inner(), &user.id).await?;

    db::message::fetch_by_chat(pg_pool.get_ref(), chat.id)
        .await
        .map_err(JsonResponse::internal_server_error)
        .map(|messages| JsonResponse::build().set_list(messages).ok("OK"))
}

/// DELETE /api/chats/{id}/messages/{message_id}
#[tracing::instrument(name = "Delete message.", skip(pg_pool))]
#[delete("/{id}/messages/{message_id}")]
pub async fn delete_message(
    user: web::ReqData<Arc<models::User>>,
    path: web::Path<(Uuid, Uuid)>,
    pg_pool: web::Data<PgPool>,
) -> Result<impl Responder> {
    let (chat_id, message_id) = path.into_inner();
    let chat = owned_chat(pg_pool.get_ref(), chat_id, &user.id).await?;

    let deleted = db::message::soft_delete(pg_pool.get_ref(), chat.id, message_id)
        .await
        .map_err(JsonResponse::internal_server_error)?;
    if !deleted {
        return Err(JsonResponse::not_found("Message not found"));
    }
    let _ = db::message::touch_chat(pg_pool.get_ref(), chat.id).await;

    Ok(JsonResponse::<models::Message>::build()
        .set_id(message_id.to_string())
        .ok("Message deleted"))
}
