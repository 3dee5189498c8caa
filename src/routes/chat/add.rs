use crate::db;
use crate::forms;
use crate::helpers::JsonResponse;
use crate::models;
use actix_web::{post, web, Responder, Result};
use serde_valid::Validate;
use sqlx::PgPool;
use std::sync::Arc;

/// POST /api/chats
#[tracing::instrument(name = "Add chat.", skip(pg_pool))]
#[post("")]
pub async fn add(
    user: web::ReqData<Arc<models::User>>,
    form: web::Json<forms::ChatForm>,
    pg_pool: web::Data<PgPool>,
) -> Result<impl Responder> {
    if let Err(errors) = form.validate() {
        return Err(JsonResponse::<models::Chat>::build().form_error(errors.to_string()));
    }

    let chat = form.into_inner().into_chat(&user.id);
    let existing = db::chat::fetch_any(pg_pool.get_ref(), chat.id)
        .await
        .map_err(JsonResponse::internal_server_error)?;
    if existing.is_some() {
        return Err(JsonResponse::bad_request("Chat already exists"));
    }

    db::chat::insert(pg_pool.get_ref(), chat)
        .await
        .map(|chat| {
            JsonResponse::<models::Chat>::build()
                .set_id(chat.id.to_string())
                .set_item(chat)
                .created("Chat created")
        })
        .map_err(|err| JsonResponse::<models::Chat>::build().internal_server_error(err))
}
