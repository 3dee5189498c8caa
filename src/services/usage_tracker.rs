//! Monthly message quotas.
//!
//! Counters live in Postgres; the current month's record is cached in the
//! key-value store under `usage:{user}:{month}`. Cache failures are logged
//! and the repository is used directly.

use crate::db;
use crate::helpers::kv_store::KeyValueStore;
use crate::models::{month_key, MessageTier, UsageLimits, UsageRecord, UsageSummary};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const USAGE_KEY_PREFIX: &str = "usage:";

#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("{tier} message limit reached ({used}/{limit})")]
    LimitExceeded {
        tier: MessageTier,
        used: i64,
        limit: i64,
    },
    #[error("usage repository error: {0}")]
    Repository(String),
}

#[async_trait]
pub trait UsageRepository: Send + Sync {
    async fn fetch(&self, user_id: &str, month: &str) -> Result<Option<UsageRecord>, String>;

    async fn increment(&self, user_id: &str, month: &str, premium: bool) -> Result<UsageRecord, String>;

    async fn fetch_limits(&self, user_id: &str) -> Result<Option<UsageLimits>, String>;

    async fn save_limits(&self, user_id: &str, limits: UsageLimits) -> Result<UsageLimits, String>;
}

pub struct PgUsageRepository {
    pool: PgPool,
}

impl PgUsageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageRepository for PgUsageRepository {
    async fn fetch(&self, user_id: &str, month: &str) -> Result<Option<UsageRecord>, String> {
        db::usage::fetch(&self.pool, user_id, month).await
    }

    async fn increment(&self, user_id: &str, month: &str, premium: bool) -> Result<UsageRecord, String> {
        db::usage::increment(&self.pool, user_id, month, premium).await
    }

    async fn fetch_limits(&self, user_id: &str) -> Result<Option<UsageLimits>, String> {
        db::usage::fetch_limits(&self.pool, user_id).await
    }

    async fn save_limits(&self, user_id: &str, limits: UsageLimits) -> Result<UsageLimits, String> {
        db::usage::upsert_limits(&self.pool, user_id, limits).await
    }
}

/// Process-local repository for tests and single-node runs without Postgres.
#[derive(Default)]
pub struct MemoryUsageRepository {
    records: Mutex<HashMap<(String, String), UsageRecord>>,
    limits: Mutex<HashMap<String, UsageLimits>>,
}

#[async_trait]
impl UsageRepository for MemoryUsageRepository {
    async fn fetch(&self, user_id: &str, month: &str) -> Result<Option<UsageRecord>, String> {
        let records = self.records.lock().await;
        Ok(records.get(&(user_id.to_string(), month.to_string())).cloned())
    }

    async fn increment(&self, user_id: &str, month: &str, premium: bool) -> Result<UsageRecord, String> {
        let mut records = self.records.lock().await;
        let record = records
            .entry((user_id.to_string(), month.to_string()))
            .or_insert_with(|| UsageRecord::empty(user_id, month));
        record.total_messages += 1;
        if premium {
            record.premium_messages += 1;
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn fetch_limits(&self, user_id: &str) -> Result<Option<UsageLimits>, String> {
        Ok(self.limits.lock().await.get(user_id).copied())
    }

    async fn save_limits(&self, user_id: &str, limits: UsageLimits) -> Result<UsageLimits, String> {
        self.limits.lock().await.insert(user_id.to_string(), limits);
        Ok(limits)
    }
}

pub struct UsageTracker {
    repository: Arc<dyn UsageRepository>,
    cache: Arc<dyn KeyValueStore>,
    defaults: UsageLimits,
    cache_ttl: Duration,
}

impl UsageTracker {
    pub fn new(
        repository: Arc<dyn UsageRepository>,
        cache: Arc<dyn KeyValueStore>,
        defaults: UsageLimits,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            repository,
            cache,
            defaults,
            cache_ttl,
        }
    }

    fn cache_key(user_id: &str, month: &str) -> String {
        format!("{}{}:{}", USAGE_KEY_PREFIX, user_id, month)
    }

    async fn cache_put(&self, record: &UsageRecord) {
        let raw = match serde_json::to_string(record) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!("Failed to encode usage record: {}", err);
                return;
            }
        };
        let key = Self::cache_key(&record.user_id, &record.month);
        if let Err(err) = self.cache.set_ex(&key, &raw, self.cache_ttl).await {
            tracing::warn!("Failed to cache usage record: {}", err);
        }
    }

    async fn cache_get(&self, user_id: &str, month: &str) -> Option<UsageRecord> {
        match self.cache.get(&Self::cache_key(user_id, month)).await {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .map_err(|err| tracing::warn!("Discarding unreadable usage cache entry: {}", err))
                .ok(),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!("Usage cache unavailable: {}", err);
                None
            }
        }
    }

    /// Current month's counters, zero when the user has none yet.
    pub async fn current_usage(&self, user_id: &str) -> Result<UsageRecord, UsageError> {
        let month = month_key(Utc::now());
        if let Some(record) = self.cache_get(user_id, &month).await {
            return Ok(record);
        }

        let record = self
            .repository
            .fetch(user_id, &month)
            .await
            .map_err(UsageError::Repository)?
            .unwrap_or_else(|| UsageRecord::empty(user_id, &month));
        self.cache_put(&record).await;

        Ok(record)
    }

    pub async fn limits(&self, user_id: &str) -> Result<UsageLimits, UsageError> {
        Ok(self
            .repository
            .fetch_limits(user_id)
            .await
            .map_err(UsageError::Repository)?
            .unwrap_or(self.defaults))
    }

    /// Fail with `LimitExceeded` when one more `tier` message would go over quota.
    #[tracing::instrument(name = "Check usage limit", skip(self))]
    pub async fn check_limit(&self, user_id: &str, tier: MessageTier) -> Result<(), UsageError> {
        let record = self.current_usage(user_id).await?;
        let limits = self.limits(user_id).await?;

        let (used, limit) = match tier {
            MessageTier::Standard => (record.standard_messages(), limits.standard_limit),
            MessageTier::Premium => (record.premium_messages, limits.premium_limit),
        };

        if used >= limit {
            tracing::info!(used, limit, "Usage limit reached");
            return Err(UsageError::LimitExceeded { tier, used, limit });
        }
        Ok(())
    }

    #[tracing::instrument(name = "Record message usage", skip(self))]
    pub async fn record_message(&self, user_id: &str, tier: MessageTier) -> Result<UsageRecord, UsageError> {
        let month = month_key(Utc::now());
        let record = self
            .repository
            .increment(user_id, &month, tier == MessageTier::Premium)
            .await
            .map_err(UsageError::Repository)?;
        self.cache_put(&record).await;

        Ok(record)
    }

    pub async fn summary(&self, user_id: &str) -> Result<UsageSummary, UsageError> {
        let record = self.current_usage(user_id).await?;
        let limits = self.limits(user_id).await?;
        Ok(UsageSummary::new(&record, limits))
    }

    pub async fn set_limits(&self, user_id: &str, limits: UsageLimits) -> Result<UsageLimits, UsageError> {
        self.repository
            .save_limits(user_id, limits)
            .await
            .map_err(UsageError::Repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::kv_store::MemoryStore;

    fn tracker(defaults: UsageLimits) -> (UsageTracker, Arc<MemoryStore>) {
        let cache = Arc::new(MemoryStore::new());
        let tracker = UsageTracker::new(
            Arc::new(MemoryUsageRepository::default()),
            cache.clone(),
            defaults,
            Duration::from_secs(300),
        );
        (tracker, cache)
    }

    #[tokio::test]
    async fn new_user_has_empty_usage_and_default_limits() {
        let (tracker, _) = tracker(UsageLimits::default());
        let summary = tracker.summary("u1").await.unwrap();

        assert_eq!(summary.month, month_key(Utc::now()));
        assert_eq!(summary.standard_messages, 0);
        assert_eq!(summary.premium_messages, 0);
        assert_eq!(summary.standard_limit, 1500);
        assert_eq!(summary.premium_limit, 100);
    }

    #[tokio::test]
    async fn premium_limit_is_enforced_separately() {
        let (tracker, _) = tracker(UsageLimits {
            standard_limit: 5,
            premium_limit: 1,
        });

        tracker.check_limit("u1", MessageTier::Premium).await.unwrap();
        tracker.record_message("u1", MessageTier::Premium).await.unwrap();

        match tracker.check_limit("u1", MessageTier::Premium).await {
            Err(UsageError::LimitExceeded { tier, used, limit }) => {
                assert_eq!(tier, MessageTier::Premium);
                assert_eq!((used, limit), (1, 1));
            }
            other => panic!("unexpected {:?}", other),
        }
        tracker.check_limit("u1", MessageTier::Standard).await.unwrap();
    }

    #[tokio::test]
    async fn recorded_usage_is_cached() {
        let (tracker, cache) = tracker(UsageLimits::default());
        tracker.record_message("u1", MessageTier::Standard).await.unwrap();

        let key = format!("usage:u1:{}", month_key(Utc::now()));
        let raw = cache.get(&key).await.unwrap().unwrap();
        let cached: UsageRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(cached.total_messages, 1);
        assert_eq!(tracker.current_usage("u1").await.unwrap().total_messages, 1);
    }

    #[tokio::test]
    async fn per_user_limits_override_defaults() {
        let (tracker, _) = tracker(UsageLimits::default());
        let limits = UsageLimits {
            standard_limit: 0,
            premium_limit: 0,
        };
        tracker.set_limits("u2", limits).await.unwrap();

        assert_eq!(tracker.limits("u2").await.unwrap(), limits);
        assert!(tracker.check_limit("u2", MessageTier::Standard).await.is_err());
        assert!(tracker.check_limit("u1", MessageTier::Standard).await.is_ok());
    }
}
