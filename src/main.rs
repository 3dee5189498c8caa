use parley::configuration::{get_configuration, StoreBackend};
use parley::helpers::kv_store::{KeyValueStore, MemoryStore, RedisStore};
use parley::startup::{run, StreamRuntime};
use parley::telemetry::{get_subscriber, init_subscriber};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber("parley".into(), "info".into());
    init_subscriber(subscriber);

    let settings = get_configuration().expect("Failed to read configuration.");

    tracing::info!(
        db_host = %settings.database.host,
        db_port = settings.database.port,
        db_name = %settings.database.database_name,
        "Connecting to PostgreSQL"
    );

    let connect_options = PgConnectOptions::new()
        .host(&settings.database.host)
        .port(settings.database.port)
        .username(&settings.database.username)
        .password(&settings.database.password)
        .database(&settings.database.database_name)
        .ssl_mode(PgSslMode::Disable);

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect_lazy_with(connect_options);

    let store: Arc<dyn KeyValueStore> = match settings.redis.backend {
        StoreBackend::Redis => Arc::new(
            RedisStore::new(&settings.redis.url)
                .await
                .expect("Failed to connect to Redis."),
        ),
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store, streams are local to this process");
            Arc::new(MemoryStore::new())
        }
    };

    let runtime = StreamRuntime::new(store.clone(), &settings.streams);
    if settings.streams.autostart_cleanup {
        runtime.scheduler.start().await;
    }

    let address = format!("{}:{}", settings.app_host, settings.app_port);
    tracing::info!("Start server at {:?}", &address);
    let listener =
        TcpListener::bind(address).expect(&format!("failed to bind to {}", settings.app_port));

    let result = run(listener, pg_pool, store, &runtime, settings).await?.await;

    runtime.scheduler.stop().await;
    result
}
