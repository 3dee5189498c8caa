use crate::models;
use sqlx::PgPool;
use tracing::Instrument;

const RECORD_COLUMNS: &str = "user_id, month, total_messages, premium_messages, updated_at";

pub async fn fetch(
    pool: &PgPool,
    user_id: &str,
    month: &str,
) -> Result<Option<models::UsageRecord>, String> {
    let query_span = tracing::info_span!("Fetch usage record", user_id = user_id, month = month);
    sqlx::query_as::<_, models::UsageRecord>(&format!(
        "SELECT {} FROM usage_records WHERE user_id = $1 AND month = $2",
        RECORD_COLUMNS
    ))
    .bind(user_id)
    .bind(month)
    .fetch_optional(pool)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to fetch usage record: {:?}", err);
        "Failed to fetch usage".to_string()
    })
}

/// Count one message, creating the month's row on first use.
pub async fn increment(
    pool: &PgPool,
    user_id: &str,
    month: &str,
    premium: bool,
) -> Result<models::UsageRecord, String> {
    let query_span = tracing::info_span!("Increment usage record", user_id = user_id, month = month);
    sqlx::query_as::<_, models::UsageRecord>(&format!(
        r#"
        INSERT INTO usage_records (user_id, month, total_messages, premium_messages, updated_at)
        VALUES ($1, $2, 1, CASE WHEN $3 THEN 1 ELSE 0 END, NOW())
        ON CONFLICT (user_id, month) DO UPDATE SET
            total_messages = usage_records.total_messages + 1,
            premium_messages = usage_records.premium_messages + EXCLUDED.premium_messages,
            updated_at = NOW()
        RETURNING {}
        "#,
        RECORD_COLUMNS
    ))
    .bind(user_id)
    .bind(month)
    .bind(premium)
    .fetch_one(pool)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to increment usage: {:?}", err);
        "Failed to record usage".to_string()
    })
}

pub async fn fetch_limits(pool: &PgPool, user_id: &str) -> Result<Option<models::UsageLimits>, String> {
    let query_span = tracing::info_span!("Fetch usage limits", user_id = user_id);
    sqlx::query_as::<_, models::UsageLimits>(
        "SELECT standard_limit, premium_limit FROM usage_limits WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to fetch usage limits: {:?}", err);
        "Failed to fetch limits".to_string()
    })
}

pub async fn upsert_limits(
    pool: &PgPool,
    user_id: &str,
    limits: models::UsageLimits,
) -> Result<models::UsageLimits, String> {
    let query_span = tracing::info_span!("Save usage limits", user_id = user_id);
    sqlx::query_as::<_, models::UsageLimits>(
        r#"
        INSERT INTO usage_limits (user_id, standard_limit, premium_limit, updated_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (user_id) DO UPDATE SET
            standard_limit = EXCLUDED.standard_limit,
            premium_limit = EXCLUDED.premium_limit,
            updated_at = EXCLUDED.updated_at
        RETURNING standard_limit, premium_limit
        "#,
    )
    .bind(user_id)
    .bind(limits.standard_limit)
    .bind(limits.premium_limit)
    .fetch_one(pool)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to save usage limits: {:?}", err);
        "Failed to save limits".to_string()
    })
}
