//! Shared fixtures for handler tests.

use crate::configuration::Settings;
use crate::connectors::chat_completions::ChatCompletionsConnector;
use crate::helpers::kv_store::MemoryStore;
use crate::models::UsageLimits;
use crate::services::{CleanupScheduler, MemoryUsageRepository, StreamManager, UsageTracker};
use actix_web::web;
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn settings() -> Settings {
    serde_json::from_value(serde_json::json!({
        "app_host": "127.0.0.1",
        "app_port": 0,
        "database": {
            "username": "postgres",
            "password": "postgres",
            "host": "localhost",
            "port": 5432,
            "database_name": "parley"
        },
        "redis": { "url": "redis://127.0.0.1:6379", "backend": "memory" },
        "streams": {
            "ttl_secs": 3600,
            "cleanup_interval_secs": 300,
            "resume_poll_ms": 10,
            "autostart_cleanup": false
        },
        "llm": {
            "base_url": "http://127.0.0.1:9",
            "timeout_secs": 5,
            "premium_models": ["premium/model"]
        },
        "usage": { "standard_limit": 1500, "premium_limit": 1, "cache_ttl_secs": 60 }
    }))
    .expect("test settings")
}

pub(crate) struct TestState {
    pub store: Arc<MemoryStore>,
    pub manager: web::Data<StreamManager>,
    pub scheduler: web::Data<CleanupScheduler>,
    pub usage: web::Data<UsageTracker>,
    pub connector: web::Data<Arc<dyn ChatCompletionsConnector>>,
    pub settings: web::Data<Settings>,
}

pub(crate) fn state(connector: Arc<dyn ChatCompletionsConnector>) -> TestState {
    let settings = settings();
    let store = Arc::new(MemoryStore::new());
    let manager = Arc::new(StreamManager::new(store.clone(), settings.streams.ttl()));
    let scheduler = CleanupScheduler::new(manager.clone(), Duration::from_secs(60));
    let usage = UsageTracker::new(
        Arc::new(MemoryUsageRepository::default()),
        store.clone(),
        UsageLimits {
            standard_limit: settings.usage.standard_limit,
            premium_limit: settings.usage.premium_limit,
        },
        Duration::from_secs(settings.usage.cache_ttl_secs),
    );

    TestState {
        store,
        manager: web::Data::from(manager),
        scheduler: web::Data::new(scheduler),
        usage: web::Data::new(usage),
        connector: web::Data::new(connector),
        settings: web::Data::new(settings),
    }
}
