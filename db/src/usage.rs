use chrono::{DateTime, Utc};
use common::error::Res;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::usage::UsageRecord;

/// Zeroes the counter if its period is over. Row stays locked until the transaction ends.
async fn roll_period(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    metric: &str,
    now: DateTime<Utc>,
    next_reset: DateTime<Utc>,
) -> Res<Option<UsageRecord>> {
    let record = sqlx::query_as::<_, UsageRecord>(
        r#"
        UPDATE usage_counters
        SET count = 0, period_reset_at = $4
        WHERE user_id = $1 AND metric = $2 AND period_reset_at <= $3
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(metric)
    .bind(now)
    .bind(next_reset)
    .fetch_optional(&mut **tx)
    .await?;

    if record.is_some() {
        return Ok(record);
    }

    sqlx::query_as::<_, UsageRecord>(
        "SELECT * FROM usage_counters WHERE user_id = $1 AND metric = $2 FOR UPDATE",
    )
    .bind(user_id)
    .bind(metric)
    .fetch_optional(&mut **tx)
    .await
    .map_err(Into::into)
}

/// Returns the counter for the current period, applying a due reset first.
pub async fn get_current(
    pool: &PgPool,
    user_id: Uuid,
    metric: &str,
    now: DateTime<Utc>,
    next_reset: DateTime<Utc>,
) -> Res<Option<UsageRecord>> {
    let mut tx = pool.begin().await?;
    let record = roll_period(&mut tx, user_id, metric, now, next_reset).await?;
    tx.commit().await?;
    Ok(record)
}

/// Adds `amount` unless that would take the counter past `limit`.
///
/// Creation, reset, check and increment run in one transaction on a locked
/// row, so concurrent callers are serialized. Returns the row after the
/// call and whether the increment was applied.
pub async fn increment(
    pool: &PgPool,
    user_id: Uuid,
    metric: &str,
    amount: i64,
    limit: Option<i64>,
    now: DateTime<Utc>,
    next_reset: DateTime<Utc>,
) -> Res<(UsageRecord, bool)> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, UsageRecord>(
        r#"
        INSERT INTO usage_counters (user_id, metric, count, period_reset_at)
        VALUES ($1, $2, 0, $4)
        ON CONFLICT (user_id, metric) DO UPDATE SET
            count = CASE WHEN usage_counters.period_reset_at <= $3
                THEN 0 ELSE usage_counters.count END,
            period_reset_at = CASE WHEN usage_counters.period_reset_at <= $3
                THEN $4 ELSE usage_counters.period_reset_at END
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(metric)
    .bind(now)
    .bind(next_reset)
    .fetch_one(&mut *tx)
    .await?;

    let updated = sqlx::query_as::<_, UsageRecord>(
        r#"
        UPDATE usage_counters
        SET count = count + $3
        WHERE user_id = $1 AND metric = $2 AND ($4::BIGINT IS NULL OR count + $3 <= $4)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(metric)
    .bind(amount)
    .bind(limit)
    .fetch_optional(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(match updated {
        Some(record) => (record, true),
        None => (current, false),
    })
}
