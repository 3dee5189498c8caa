use crate::configuration::Settings;
use crate::helpers::JsonResponse;
use crate::models;
use crate::routes::stream::stream_error;
use crate::services::stream_manager::is_expired;
use crate::services::StreamManager;
use actix_web::{get, web, HttpResponse, Result};
use chrono::Utc;
use futures::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

/// GET /api/streams/{id}/resume
/// Replays everything generated so far, then follows the record until it
/// reaches a terminal status.
#[tracing::instrument(name = "Resume stream.", skip(manager, settings))]
#[get("/{id}/resume")]
pub async fn resume_handler(
    user: web::ReqData<Arc<models::User>>,
    path: web::Path<String>,
    manager: web::Data<StreamManager>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse> {
    let stream_id = path.into_inner();
    let state = manager
        .authorize(&stream_id, &user.id)
        .await
        .map_err(stream_error)?;

    if state.status == models::StreamStatus::Cancelled {
        return Err(JsonResponse::gone("Stream was cancelled"));
    }

    tracing::info!(status = %state.status, position = state.position, "Resuming stream");

    let body = follow_stream(
        manager.into_inner(),
        state,
        settings.streams.resume_poll_interval(),
        settings.llm.request_timeout(),
    );

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("X-Stream-Id", stream_id))
        .streaming(body))
}

/// Stored content first, then whatever the writer appends. Gives up on a
/// record that is still `streaming` but has not been written for longer than
/// `idle_timeout`, since no writer is left to finish it.
pub(crate) fn follow_stream(
    manager: Arc<StreamManager>,
    initial: models::StreamState,
    poll_interval: Duration,
    idle_timeout: Duration,
) -> impl Stream<Item = Result<web::Bytes, Infallible>> {
    async_stream::stream! {
        let stream_id = initial.stream_id;
        let mut sent = initial.content.len();
        let mut status = initial.status;

        if sent > 0 {
            yield Ok(web::Bytes::from(initial.content));
        }

        while !status.is_terminal() {
            tokio::time::sleep(poll_interval).await;

            let state = match manager.get_stream_state(&stream_id).await {
                Ok(Some(state)) => state,
                Ok(None) => {
                    tracing::info!(stream_id = %stream_id, "Stream record disappeared while resuming");
                    break;
                }
                Err(err) => {
                    tracing::warn!(stream_id = %stream_id, "Failed to poll stream: {}", err);
                    break;
                }
            };

            // content only ever grows
            if state.content.len() > sent {
                yield Ok(web::Bytes::copy_from_slice(&state.content.as_bytes()[sent..]));
                sent = state.content.len();
            }
            status = state.status;

            if !status.is_terminal() && is_expired(state.last_activity, Utc::now(), idle_timeout) {
                tracing::warn!(stream_id = %stream_id, "Stream writer went silent, ending resume");
                break;
            }
        }
    }
}
