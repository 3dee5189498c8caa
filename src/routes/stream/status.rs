use crate::helpers::JsonResponse;
use crate::models;
use crate::routes::stream::stream_error;
use crate::services::StreamManager;
use actix_web::{get, web, Responder, Result};
use std::sync::Arc;

/// GET /api/streams
/// Ids of the caller's streams that are still generating.
#[tracing::instrument(name = "List active streams.", skip(manager))]
#[get("")]
pub async fn list_handler(
    user: web::ReqData<Arc<models::User>>,
    manager: web::Data<StreamManager>,
) -> Result<impl Responder> {
    manager
        .get_active_streams(&user.id)
        .await
        .map(|ids| JsonResponse::<String>::build().set_list(ids).ok("OK"))
        .map_err(stream_error)
}

/// GET /api/streams/{id}/status
#[tracing::instrument(name = "Get stream status.", skip(manager))]
#[get("/{id}/status")]
pub async fn status_handler(
    user: web::ReqData<Arc<models::User>>,
    path: web::Path<String>,
    manager: web::Data<StreamManager>,
) -> Result<impl Responder> {
    let stream_id = path.into_inner();
    let state = manager
        .authorize(&stream_id, &user.id)
        .await
        .map_err(stream_error)?;

    Ok(JsonResponse::<models::StreamStatusView>::build()
        .set_id(stream_id)
        .set_item(models::StreamStatusView::from(Some(state)))
        .ok("OK"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::chat_completions::MockChatCompletionsConnector;
    use crate::middleware::authentication::Manager;
    use crate::routes::testing;
    use crate::services::StartStream;
    use actix_web::{http::StatusCode, test, App};

    fn start(user_id: &str) -> StartStream {
        StartStream {
            chat_id: "chat-1".to_string(),
            message_id: "msg-1".to_string(),
            user_id: user_id.to_string(),
            model_id: "test/model".to_string(),
            messages: vec![],
            api_key: Some("sk-secret".to_string()),
        }
    }

    #[actix_web::test]
    async fn status_exposes_progress_but_not_the_key() {
        let state = testing::state(Arc::new(MockChatCompletionsConnector::default()));
        let stream_id = state.manager.start_stream(start("u1")).await.unwrap();
        state
            .manager
            .update_stream_content(&stream_id, "partial", 3)
            .await
            .unwrap();

        let app = test::init_service(
            App::new()
                .wrap(Manager::new())
                .app_data(state.manager.clone())
                .service(web::scope("/api/streams").service(status_handler)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/streams/{}/status", stream_id))
            .insert_header(("x-user-id", "u1"))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["item"]["exists"], true);
        assert_eq!(body["item"]["status"], "streaming");
        assert_eq!(body["item"]["content"], "partial");
        assert_eq!(body["item"]["position"], 3);
        assert!(!body.to_string().contains("sk-secret"));

        let req = test::TestRequest::get()
            .uri(&format!("/api/streams/{}/status", stream_id))
            .insert_header(("x-user-id", "u2"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn list_returns_only_callers_active_streams() {
        let state = testing::state(Arc::new(MockChatCompletionsConnector::default()));
        let first = state.manager.start_stream(start("u1")).await.unwrap();
        let second = state.manager.start_stream(start("u1")).await.unwrap();
        state.manager.start_stream(start("u2")).await.unwrap();
        state.manager.complete_stream(&first).await.unwrap();

        let app = test::init_service(
            App::new()
                .wrap(Manager::new())
                .app_data(state.manager.clone())
                .service(web::scope("/api/streams").service(list_handler)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/streams")
            .insert_header(("x-user-id", "u1"))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["list"], serde_json::json!([second]));
    }
}
