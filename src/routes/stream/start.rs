use crate::configuration::Settings;
use crate::connectors::chat_completions::{ChatCompletionsConnector, CompletionRequest};
use crate::forms;
use crate::helpers::JsonResponse;
use crate::models;
use crate::routes::usage::usage_error;
use crate::services::{generation, StreamManager, UsageTracker};
use actix_web::{post, web, Responder, Result};
use serde_valid::Validate;
use std::sync::Arc;

/// POST /api/streams
/// Checks the caller's quota, records the stream and starts generation in the
/// background. The generation task outlives this request.
#[tracing::instrument(name = "Start stream.", skip(form, manager, connector, usage, settings))]
#[post("")]
pub async fn start_handler(
    user: web::ReqData<Arc<models::User>>,
    form: web::Json<forms::StartStreamForm>,
    manager: web::Data<StreamManager>,
    connector: web::Data<Arc<dyn ChatCompletionsConnector>>,
    usage: web::Data<UsageTracker>,
    settings: web::Data<Settings>,
) -> Result<impl Responder> {
    if let Err(errors) = form.validate() {
        return Err(JsonResponse::<models::StreamStarted>::build().form_error(errors.to_string()));
    }

    let form = form.into_inner();
    let tier = if settings.llm.is_premium(&form.model_id) {
        models::MessageTier::Premium
    } else {
        models::MessageTier::Standard
    };

    usage
        .check_limit(&user.id, tier)
        .await
        .map_err(usage_error)?;

    let start = form.into_start(&user.id);
    let request = CompletionRequest {
        model: start.model_id.clone(),
        messages: start.messages.clone(),
        api_key: start.api_key.clone(),
    };

    let stream_id = manager.start_stream(start).await.map_err(|err| {
        tracing::error!("Failed to start stream: {}", err);
        JsonResponse::<models::StreamStarted>::build().internal_server_error("Could not start stream")
    })?;

    if let Err(err) = usage.record_message(&user.id, tier).await {
        tracing::warn!("Failed to record usage for stream {}: {}", stream_id, err);
    }

    generation::spawn_generation(
        manager.into_inner(),
        connector.get_ref().clone(),
        stream_id.clone(),
        request,
    );

    Ok(JsonResponse::<models::StreamStarted>::build()
        .set_id(stream_id.clone())
        .set_item(models::StreamStarted { stream_id })
        .created("Stream started"))
}
