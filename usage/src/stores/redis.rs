use api_tiers::Metric;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use redis::Script;
use uuid::Uuid;

use crate::{
    counter::{Increment, UsageCounter, UsageStore},
    period,
};

// KEYS[1] counter hash
// ARGV: now, amount, limit (-1 = none), next reset
// Returns {count, period_reset_at, applied}
const INCREMENT_SCRIPT: &str = r#"
local count = tonumber(redis.call('HGET', KEYS[1], 'count') or '0')
local reset_at = tonumber(redis.call('HGET', KEYS[1], 'period_reset_at') or '0')
if reset_at == 0 or tonumber(ARGV[1]) >= reset_at then
    count = 0
    reset_at = tonumber(ARGV[4])
end
local amount = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])
local applied = 0
if limit < 0 or count + amount <= limit then
    count = count + amount
    applied = 1
end
redis.call('HSET', KEYS[1], 'count', count, 'period_reset_at', reset_at)
redis.call('EXPIREAT', KEYS[1], reset_at)
return {count, reset_at, applied}
"#;

// KEYS[1] counter hash
// ARGV: now, next reset
// Returns {} for a missing counter, else {count, period_reset_at}
const CURRENT_SCRIPT: &str = r#"
local reset_at = tonumber(redis.call('HGET', KEYS[1], 'period_reset_at') or '0')
if reset_at == 0 then
    return {}
end
local count = tonumber(redis.call('HGET', KEYS[1], 'count') or '0')
if tonumber(ARGV[1]) >= reset_at then
    count = 0
    reset_at = tonumber(ARGV[2])
    redis.call('HSET', KEYS[1], 'count', count, 'period_reset_at', reset_at)
    redis.call('EXPIREAT', KEYS[1], reset_at)
end
return {count, reset_at}
"#;

/// Counters as Redis hashes, `usage:{user}:{metric}`, updated by Lua
/// scripts so each call is one atomic step on the server. Keys expire at
/// their reset time.
pub struct RedisStore {
    pool: deadpool_redis::Pool,
    increment: Script,
    current: Script,
}

impl RedisStore {
    pub fn new(pool: deadpool_redis::Pool) -> Self {
        Self {
            pool,
            increment: Script::new(INCREMENT_SCRIPT),
            current: Script::new(CURRENT_SCRIPT),
        }
    }

    /// Builds a connection pool and checks the server answers.
    pub async fn connect(url: &str) -> Res<Self> {
        let pool = deadpool_redis::Config::from_url(url)
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| AppError::Config(format!("Failed to create Redis pool: {}", e)))?;

        let mut conn = pool.get().await.map_err(|e| {
            AppError::StorageUnavailable(format!("Failed to get Redis connection: {}", e))
        })?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        Ok(Self::new(pool))
    }

    async fn connection(&self) -> Res<deadpool_redis::Connection> {
        self.pool.get().await.map_err(|e| {
            AppError::StorageUnavailable(format!("Failed to get Redis connection: {}", e))
        })
    }
}

fn counter_key(user_id: Uuid, metric: Metric) -> String {
    format!("usage:{}:{}", user_id, metric)
}

fn to_counter(user_id: Uuid, metric: Metric, count: i64, reset_at: i64) -> Res<UsageCounter> {
    let period_reset_at = DateTime::from_timestamp(reset_at, 0).ok_or_else(|| {
        AppError::Internal(format!("Invalid reset timestamp {} for {}", reset_at, metric))
    })?;
    Ok(UsageCounter {
        user_id,
        metric,
        count: count.max(0) as u64,
        period_reset_at,
    })
}

fn unavailable(user_id: Uuid, e: redis::RedisError) -> AppError {
    AppError::StorageUnavailable(format!(
        "Redis error updating usage for {}: {}",
        user_id, e
    ))
}

#[async_trait]
impl UsageStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn current(
        &self,
        user_id: Uuid,
        metric: Metric,
        now: DateTime<Utc>,
    ) -> Res<Option<UsageCounter>> {
        let mut conn = self.connection().await?;

        let reply: Vec<i64> = self
            .current
            .key(counter_key(user_id, metric))
            .arg(now.timestamp())
            .arg(period::next_reset(now).timestamp())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| unavailable(user_id, e))?;

        match reply.as_slice() {
            [] => Ok(None),
            [count, reset_at] => to_counter(user_id, metric, *count, *reset_at).map(Some),
            other => Err(AppError::Internal(format!(
                "Unexpected usage script reply: {:?}",
                other
            ))),
        }
    }

    async fn increment(
        &self,
        user_id: Uuid,
        metric: Metric,
        amount: u64,
        limit: Option<u64>,
        now: DateTime<Utc>,
    ) -> Res<Increment> {
        let mut conn = self.connection().await?;
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

        let (count, reset_at, applied): (i64, i64, i64) = self
            .increment
            .key(counter_key(user_id, metric))
            .arg(now.timestamp())
            .arg(i64::try_from(amount).unwrap_or(i64::MAX))
            .arg(limit)
            .arg(period::next_reset(now).timestamp())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| unavailable(user_id, e))?;

        let counter = to_counter(user_id, metric, count, reset_at)?;
        log::debug!(
            "Usage {} for {}: {} (limit {})",
            metric,
            user_id,
            counter.count,
            limit
        );
        Ok(if applied == 1 {
            Increment::Applied(counter)
        } else {
            Increment::Rejected(counter)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_per_user_and_metric() {
        let user = Uuid::nil();
        assert_eq!(
            counter_key(user, Metric::CoverLetters),
            "usage:00000000-0000-0000-0000-000000000000:cover_letters"
        );
    }

    #[test]
    fn reply_timestamps_convert_back() {
        let counter = to_counter(Uuid::nil(), Metric::Resumes, 3, 1_767_225_600).unwrap();
        assert_eq!(counter.count, 3);
        assert_eq!(counter.period_reset_at.to_rfc3339(), "2026-01-01T00:00:00+00:00");
    }
}
