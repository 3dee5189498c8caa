use serde;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub app_port: u16,
    pub app_host: String,
    pub redis: RedisSettings,
    #[serde(default)]
    pub streams: StreamSettings,
    pub llm: LlmSettings,
    #[serde(default)]
    pub usage: UsageSettings,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RedisSettings {
    pub url: String,
    pub backend: StoreBackend,
}

/// Stream record lifetime and sweep cadence.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct StreamSettings {
    pub ttl_secs: u64,
    pub cleanup_interval_secs: u64,
    pub resume_poll_ms: u64,
    #[serde(default = "default_true")]
    pub autostart_cleanup: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            cleanup_interval_secs: 300,
            resume_poll_ms: 250,
            autostart_cleanup: true,
        }
    }
}

impl StreamSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn resume_poll_interval(&self) -> Duration {
        Duration::from_millis(self.resume_poll_ms)
    }
}

/// Upstream chat-completions provider
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LlmSettings {
    /// Base URL, `/chat/completions` is appended (e.g. https://openrouter.ai/api/v1)
    pub base_url: String,
    pub timeout_secs: u64,
    /// Server-side key (from env: LLM_API_KEY). Callers may supply their own per stream.
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub premium_models: Vec<String>,
}

impl LlmSettings {
    /// Upper bound on one upstream request, and so on the silence between
    /// two writes of a live generation.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn is_premium(&self, model_id: &str) -> bool {
        self.premium_models.iter().any(|m| m == model_id)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct UsageSettings {
    pub standard_limit: i64,
    pub premium_limit: i64,
    pub cache_ttl_secs: u64,
}

impl Default for UsageSettings {
    fn default() -> Self {
        Self {
            standard_limit: 1500,
            premium_limit: 100,
            cache_ttl_secs: 300,
        }
    }
}

fn default_true() -> bool {
    true
}

impl DatabaseSettings {
    // Connection string: postgresql://<username>:<password>@<host>:<port>/<database_name>
    pub fn connection_string(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name,
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port,
        )
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration"))
        .add_source(config::Environment::with_prefix("PARLEY").separator("__"))
        .build()?;

    let mut config: Settings = settings.try_deserialize()?;

    if let Ok(url) = std::env::var("REDIS_URL") {
        config.redis.url = url;
    }
    config.llm.api_key = std::env::var("LLM_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty());

    Ok(config)
}
