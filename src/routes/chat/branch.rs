use crate::db;
use crate::forms;
use crate::helpers::JsonResponse;
use crate::models;
use crate::routes::chat::owned_chat;
use actix_web::{post, web, Responder, Result};
use serde_valid::Validate;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// POST /api/chats/{id}/branch
/// New chat holding the parent's messages up to `position`.
#[tracing::instrument(name = "Branch chat.", skip(pg_pool))]
#[post("/{id}/branch")]
pub async fn branch(
    user: web::ReqData<Arc<models::User>>,
    path: web::Path<Uuid>,
    form: web::Json<forms::BranchForm>,
    pg_pool: web::Data<PgPool>,
) -> Result<impl Responder> {
    if let Err(errors) = form.validate() {
        return Err(JsonResponse::<models::Chat>::build().form_error(errors.to_string()));
    }

    let parent = owned_chat(pg_pool.get_ref(), path.into_inner(), &user.id).await?;
    let form = form.into_inner();
    let title = form
        .title
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| format!("{} (branch)", parent.title));

    let branch = models::Chat {
        id: Uuid::new_v4(),
        user_id: user.id.clone(),
        title,
        parent_chat_id: Some(parent.id),
        ..Default::default()
    };

    db::chat::create_branch(pg_pool.get_ref(), parent.id, branch, form.position)
        .await
        .map(|chat| {
            JsonResponse::<models::Chat>::build()
                .set_id(chat.id.to_string())
                .set_item(chat)
                .created("Branch created")
        })
        .map_err(|err| JsonResponse::<models::Chat>::build().internal_server_error(err))
}
