mod add;
mod branch;
mod delete;
mod get;
mod message;
mod sync;
mod update;

pub use add::*;
pub use branch::*;
pub use delete::*;
pub use get::*;
pub use message::*;
pub use sync::*;
pub use update::*;

use crate::db;
use crate::helpers::JsonResponse;
use crate::models;
use sqlx::PgPool;
use uuid::Uuid;

/// Live chat owned by `user_id`; 404 when missing, 403 when owned by someone else.
pub(crate) async fn owned_chat(pool: &PgPool, id: Uuid, user_id: &str) -> actix_web::Result<models::Chat> {
    let chat = db::chat::fetch(pool, id)
        .await
        .map_err(JsonResponse::internal_server_error)?
        .ok_or_else(|| JsonResponse::not_found("Chat not found"))?;

    if chat.user_id != user_id {
        return Err(JsonResponse::forbidden("Not authorized for this chat"));
    }
    Ok(chat)
}
