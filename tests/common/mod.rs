use parley::configuration::{get_configuration, DatabaseSettings, Settings};
use parley::helpers::kv_store::MemoryStore;
use parley::startup::{run, StreamRuntime};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub store: Arc<MemoryStore>,
    pub runtime: StreamRuntime,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

pub async fn spawn_app_with_configuration(mut configuration: Settings) -> Option<TestApp> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();

    let connection_pool = match configure_database(&configuration.database).await {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("Skipping tests: failed to connect to postgres: {}", err);
            return None;
        }
    };

    let store = Arc::new(MemoryStore::new());
    let runtime = StreamRuntime::new(store.clone(), &configuration.streams);

    let server = run(listener, connection_pool.clone(), store.clone(), &runtime, configuration)
        .await
        .expect("Failed to bind address.");

    let _ = tokio::spawn(server);
    println!("Used Port: {}", port);

    Some(TestApp {
        address,
        db_pool: connection_pool,
        store,
        runtime,
    })
}

/// App whose upstream provider is `upstream_url` (usually a wiremock server).
pub async fn spawn_app_with_upstream(upstream_url: &str) -> Option<TestApp> {
    let mut configuration = get_configuration().expect("Failed to get configuration");
    configuration.llm.base_url = upstream_url.to_string();
    configuration.llm.api_key = Some("test-key".to_string());
    configuration.streams.resume_poll_ms = 20;

    spawn_app_with_configuration(configuration).await
}

pub async fn spawn_app() -> Option<TestApp> {
    let configuration = get_configuration().expect("Failed to get configuration");
    spawn_app_with_configuration(configuration).await
}

pub async fn configure_database(config: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    let mut connection = PgConnection::connect(&config.connection_string_without_db()).await?;

    connection
        .execute(format!(r#"CREATE DATABASE "{}""#, config.database_name).as_str())
        .await?;

    let connection_pool = PgPool::connect(&config.connection_string()).await?;

    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await?;

    Ok(connection_pool)
}
