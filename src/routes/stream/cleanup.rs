use crate::helpers::JsonResponse;
use crate::models;
use crate::routes::stream::stream_error;
use crate::services::CleanupScheduler;
use actix_web::{get, post, web, Responder, Result};
use std::sync::Arc;

fn require_admin(user: &models::User) -> Result<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(JsonResponse::forbidden("Admin role required"))
    }
}

/// POST /api/streams/cleanup
/// One sweep now, outside the schedule.
#[tracing::instrument(name = "Force stream cleanup.", skip(scheduler))]
#[post("/cleanup")]
pub async fn cleanup_handler(
    user: web::ReqData<Arc<models::User>>,
    scheduler: web::Data<CleanupScheduler>,
) -> Result<impl Responder> {
    require_admin(&user)?;
    let removed = scheduler.run_once().await.map_err(stream_error)?;

    Ok(JsonResponse::<usize>::build()
        .set_item(removed)
        .ok(format!("Removed {} expired streams", removed)))
}

#[tracing::instrument(name = "Start stream cleanup.", skip(scheduler))]
#[post("/cleanup/start")]
pub async fn cleanup_start_handler(
    user: web::ReqData<Arc<models::User>>,
    scheduler: web::Data<CleanupScheduler>,
) -> Result<impl Responder> {
    require_admin(&user)?;
    let started = scheduler.start().await;
    let msg = if started {
        "Cleanup started"
    } else {
        "Cleanup already running"
    };

    Ok(JsonResponse::<bool>::build().set_item(started).ok(msg))
}

#[tracing::instrument(name = "Stop stream cleanup.", skip(scheduler))]
#[post("/cleanup/stop")]
pub async fn cleanup_stop_handler(
    user: web::ReqData<Arc<models::User>>,
    scheduler: web::Data<CleanupScheduler>,
) -> Result<impl Responder> {
    require_admin(&user)?;
    let stopped = scheduler.stop().await;
    let msg = if stopped {
        "Cleanup stopped"
    } else {
        "Cleanup was not running"
    };

    Ok(JsonResponse::<bool>::build().set_item(stopped).ok(msg))
}

/// GET /api/streams/cleanup
/// Whether the periodic sweep is running.
#[tracing::instrument(name = "Stream cleanup status.", skip(scheduler))]
#[get("/cleanup")]
pub async fn cleanup_status_handler(
    user: web::ReqData<Arc<models::User>>,
    scheduler: web::Data<CleanupScheduler>,
) -> Result<impl Responder> {
    require_admin(&user)?;
    let running = scheduler.is_running().await;

    Ok(JsonResponse::<bool>::build()
        .set_item(running)
        .ok(format!("Sweep every {}s", scheduler.interval().as_secs())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::chat_completions::MockChatCompletionsConnector;
    use crate::middleware::authentication::Manager;
    use crate::routes::testing;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn admin_controls_the_sweep() {
        let state = testing::state(Arc::new(MockChatCompletionsConnector::default()));
        let app = test::init_service(
            App::new()
                .wrap(Manager::new())
                .app_data(state.scheduler.clone())
                .service(
                    web::scope("/api/streams")
                        .service(cleanup_handler)
                        .service(cleanup_start_handler)
                        .service(cleanup_stop_handler)
                        .service(cleanup_status_handler),
                ),
        )
        .await;

        let admin = |req: test::TestRequest| {
            req.insert_header(("x-user-id", "root"))
                .insert_header(("x-user-role", "admin"))
                .to_request()
        };

        let req = test::TestRequest::post()
            .uri("/api/streams/cleanup/start")
            .insert_header(("x-user-id", "u1"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = admin(test::TestRequest::post().uri("/api/streams/cleanup/start"));
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["item"], true);
        assert!(state.scheduler.is_running().await);

        let req = admin(test::TestRequest::post().uri("/api/streams/cleanup/start"));
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["item"], false);
        assert_eq!(body["message"], "Cleanup already running");

        let req = admin(test::TestRequest::get().uri("/api/streams/cleanup"));
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["item"], true);

        let req = admin(test::TestRequest::post().uri("/api/streams/cleanup/stop"));
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["item"], true);
        assert!(!state.scheduler.is_running().await);

        let req = admin(test::TestRequest::post().uri("/api/streams/cleanup/stop"));
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["item"], false);

        let req = admin(test::TestRequest::post().uri("/api/streams/cleanup"));
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["item"], 0);
    }
}
