use crate::helpers::JsonResponse;
use crate::models;
use crate::routes::stream::stream_error;
use crate::services::StreamManager;
use actix_web::{post, web, Responder, Result};
use std::sync::Arc;

/// POST /api/streams/{id}/cancel
/// Marks the stream cancelled; the generation task stops on its next write.
#[tracing::instrument(name = "Cancel stream.", skip(manager))]
#[post("/{id}/cancel")]
pub async fn cancel_handler(
    user: web::ReqData<Arc<models::User>>,
    path: web::Path<String>,
    manager: web::Data<StreamManager>,
) -> Result<impl Responder> {
    let stream_id = path.into_inner();
    manager
        .authorize(&stream_id, &user.id)
        .await
        .map_err(stream_error)?;

    let cancelled = manager.cancel_stream(&stream_id).await.map_err(stream_error)?;
    let msg = if cancelled {
        "Stream cancelled"
    } else {
        "Stream already finished"
    };

    Ok(JsonResponse::<bool>::build()
        .set_id(stream_id)
        .set_item(cancelled)
        .ok(msg))
}
