use crate::configuration::{Settings, StreamSettings};
use crate::connectors::{ChatCompletionsClient, ChatCompletionsConnector};
use crate::helpers::kv_store::KeyValueStore;
use crate::middleware;
use crate::models::UsageLimits;
use crate::routes;
use crate::services::{CleanupScheduler, PgUsageRepository, StreamManager, UsageTracker};
use actix_cors::Cors;
use actix_web::{dev::Server, error, http, web, App, HttpServer};
use sqlx::{Pool, Postgres};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tracing_actix_web::TracingLogger;

/// Stream manager and its sweep, shared by the HTTP layer and `main`.
pub struct StreamRuntime {
    pub manager: Arc<StreamManager>,
    pub scheduler: Arc<CleanupScheduler>,
}

impl StreamRuntime {
    pub fn new(store: Arc<dyn KeyValueStore>, settings: &StreamSettings) -> Self {
        let manager = Arc::new(StreamManager::new(store, settings.ttl()));
        let scheduler = Arc::new(CleanupScheduler::new(
            manager.clone(),
            settings.cleanup_interval(),
        ));
        Self { manager, scheduler }
    }
}

pub async fn run(
    listener: TcpListener,
    pg_pool: Pool<Postgres>,
    store: Arc<dyn KeyValueStore>,
    runtime: &StreamRuntime,
    settings: Settings,
) -> Result<Server, std::io::Error> {
    let stream_manager = web::Data::from(runtime.manager.clone());
    let cleanup_scheduler = web::Data::from(runtime.scheduler.clone());

    let connector = ChatCompletionsClient::new(&settings.llm)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
    let connector: web::Data<Arc<dyn ChatCompletionsConnector>> =
        web::Data::new(Arc::new(connector));

    let usage_tracker = web::Data::new(UsageTracker::new(
        Arc::new(PgUsageRepository::new(pg_pool.clone())),
        store,
        UsageLimits {
            standard_limit: settings.usage.standard_limit,
            premium_limit: settings.usage.premium_limit,
        },
        Duration::from_secs(settings.usage.cache_ttl_secs),
    ));

    let settings = web::Data::new(settings);
    let pg_pool = web::Data::new(pg_pool);

    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let msg: String = match err {
            error::JsonPayloadError::Deserialize(err) => format!(
                "{{\"kind\":\"deserialize\",\"line\":{}, \"column\":{}, \"msg\":\"{}\"}}",
                err.line(),
                err.column(),
                err
            ),
            _ => format!("{{\"kind\":\"other\",\"msg\":\"{}\"}}", err),
        };
        error::InternalError::new(msg, http::StatusCode::BAD_REQUEST).into()
    });

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(middleware::authentication::Manager::new())
            .wrap(Cors::permissive())
            .service(web::scope("/health_check").service(routes::health_check))
            .service(
                web::scope("/api")
                    .service(
                        web::scope("/streams")
                            .service(routes::stream::cleanup_handler)
                            .service(routes::stream::cleanup_start_handler)
                            .service(routes::stream::cleanup_stop_handler)
                            .service(routes::stream::cleanup_status_handler)
                            .service(routes::stream::start_handler)
                            .service(routes::stream::list_handler)
                            .service(routes::stream::resume_handler)
                            .service(routes::stream::status_handler)
                            .service(routes::stream::cancel_handler),
                    )
                    .service(web::scope("/usage").service(routes::usage::usage_handler))
                    .service(
                        web::scope("/chats")
                            .service(routes::chat::sync)
                            .service(routes::chat::list)
                            .service(routes::chat::add)
                            .service(routes::chat::item)
                            .service(routes::chat::update)
                            .service(routes::chat::delete)
                            .service(routes::chat::branch)
                            .service(routes::chat::add_message)
                            .service(routes::chat::list_messages)
                            .service(routes::chat::delete_message),
                    ),
            )
            .service(
                web::scope("/admin")
                    .service(web::scope("/usage").service(routes::usage::admin_limits_handler)),
            )
            .app_data(json_config.clone())
            .app_data(pg_pool.clone())
            .app_data(settings.clone())
            .app_data(stream_manager.clone())
            .app_data(cleanup_scheduler.clone())
            .app_data(connector.clone())
            .app_data(usage_tracker.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
