use crate::db;
use crate::forms;
use crate::helpers::JsonResponse;
use crate::models;
use crate::routes::chat::owned_chat;
use actix_web::{put, web, Responder, Result};
use serde_valid::Validate;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// PUT /api/chats/{id}
/// Title and pinned flag only.
#[tracing::instrument(name = "Update chat.", skip(pg_pool))]
#[put("/{id}")]
pub async fn update(
    user: web::ReqData<Arc<models::User>>,
    path: web::Path<Uuid>,
    form: web::Json<forms::UpdateChatForm>,
    pg_pool: web::Data<PgPool>,
) -> Result<impl Responder> {
    if let Err(errors) = form.validate() {
        return Err(JsonResponse::<models::Chat>::build().form_error(errors.to_string()));
    }

    let mut chat = owned_chat(pg_pool.get_ref(), path.into_inner(), &user.id).await?;
    form.into_inner().apply(&mut chat);

    db::chat::update(pg_pool.get_ref(), chat)
        .await
        .map(|chat| JsonResponse::<models::Chat>::build().set_item(chat).ok("Chat updated"))
        .map_err(|err| JsonResponse::<models::Chat>::build().internal_server_error(err))
}
