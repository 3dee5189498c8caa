use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Monthly counters for one user. `total_messages` includes premium ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub user_id: String,
    pub month: String,
    pub total_messages: i64,
    pub premium_messages: i64,
    pub updated_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn empty(user_id: &str, month: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            month: month.to_string(),
            total_messages: 0,
            premium_messages: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn standard_messages(&self) -> i64 {
        self.total_messages - self.premium_messages
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimits {
    pub standard_limit: i64,
    pub premium_limit: i64,
}

impl Default for UsageLimits {
    fn default() -> Self {
        Self {
            standard_limit: 1500,
            premium_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageTier {
    Standard,
    Premium,
}

impl std::fmt::Display for MessageTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageTier::Standard => write!(f, "standard"),
            MessageTier::Premium => write!(f, "premium"),
        }
    }
}

/// Usage plus limits, as returned to the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub month: String,
    pub standard_messages: i64,
    pub premium_messages: i64,
    pub standard_limit: i64,
    pub premium_limit: i64,
}

impl UsageSummary {
    pub fn new(record: &UsageRecord, limits: UsageLimits) -> Self {
        Self {
            month: record.month.clone(),
            standard_messages: record.standard_messages(),
            premium_messages: record.premium_messages,
            standard_limit: limits.standard_limit,
            premium_limit: limits.premium_limit,
        }
    }
}

/// Billing month key, e.g. `2026-10`.
pub fn month_key(at: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", at.year(), at.month())
}
