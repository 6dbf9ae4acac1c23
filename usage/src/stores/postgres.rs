use std::sync::Arc;

use api_tiers::Metric;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use db::models::usage::UsageRecord;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    counter::{Increment, UsageCounter, UsageStore},
    period,
};

/// Counters in the `usage_counters` table.
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

// SQLSTATE numeric_value_out_of_range
const NUMERIC_OVERFLOW: &str = "22003";

fn unavailable(err: AppError) -> AppError {
    match err {
        AppError::Database(sqlx::Error::Database(e))
            if e.code().as_deref() == Some(NUMERIC_OVERFLOW) =>
        {
            AppError::BadRequest("Usage counter would overflow".to_string())
        }
        AppError::Database(e) => AppError::StorageUnavailable(e.to_string()),
        other => other,
    }
}

fn to_counter(record: UsageRecord, metric: Metric) -> UsageCounter {
    UsageCounter {
        user_id: record.user_id,
        metric,
        count: record.count.max(0) as u64,
        period_reset_at: record.period_reset_at,
    }
}

#[async_trait]
impl UsageStore for PostgresStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn current(
        &self,
        user_id: Uuid,
        metric: Metric,
        now: DateTime<Utc>,
    ) -> Res<Option<UsageCounter>> {
        let record = db::usage::get_current(
            &self.pool,
            user_id,
            metric.as_str(),
            now,
            period::next_reset(now),
        )
        .await
        .map_err(unavailable)?;

        Ok(record.map(|r| to_counter(r, metric)))
    }

    async fn increment(
        &self,
        user_id: Uuid,
        metric: Metric,
        amount: u64,
        limit: Option<u64>,
        now: DateTime<Utc>,
    ) -> Res<Increment> {
        let clamp = |v: u64| i64::try_from(v).unwrap_or(i64::MAX);

        let (record, applied) = db::usage::increment(
            &self.pool,
            user_id,
            metric.as_str(),
            clamp(amount),
            limit.map(clamp),
            now,
            period::next_reset(now),
        )
        .await
        .map_err(unavailable)?;

        let counter = to_counter(record, metric);
        Ok(if applied {
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
    fn connection_failures_become_unavailable() {
        let err = unavailable(AppError::Database(sqlx::Error::PoolTimedOut));
        assert!(matches!(err, AppError::StorageUnavailable(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn other_errors_pass_through() {
        let err = unavailable(AppError::BadRequest("x".to_string()));
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
