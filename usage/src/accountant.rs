use std::{future::Future, sync::Arc, time::Duration};

use api_tiers::{Metric, Quota};
use common::{
    env_config::Config,
    error::{AppError, Res},
};
use uuid::Uuid;

use crate::{
    clock::{Clock, SystemClock},
    counter::{Increment, UsageCounter, UsageStore},
};

/// Sole writer of usage counters.
///
/// Every call takes the current time from its clock, so period resets
/// happen lazily on the first access after a boundary. Transient store
/// failures are retried once after `retry_backoff`.
#[derive(Clone)]
pub struct UsageAccountant {
    store: Arc<dyn UsageStore>,
    clock: Arc<dyn Clock>,
    retry_backoff: Duration,
}

impl UsageAccountant {
    pub fn new(store: Arc<dyn UsageStore>, clock: Arc<dyn Clock>, retry_backoff: Duration) -> Self {
        Self {
            store,
            clock,
            retry_backoff,
        }
    }

    pub fn from_config(store: Arc<dyn UsageStore>, config: &Config) -> Self {
        Self::new(store, Arc::new(SystemClock), config.usage_retry_backoff)
    }

    /// Count for the current period; 0 when nothing was recorded yet.
    pub async fn get_current_count(&self, user_id: Uuid, metric: Metric) -> Res<u64> {
        let counter = self
            .with_retry("read", || self.store.current(user_id, metric, self.clock.now()))
            .await?;
        Ok(counter.map_or(0, |c| c.count))
    }

    /// Current counts for every metric, in `Metric::ALL` order.
    pub async fn get_all_counts(&self, user_id: Uuid) -> Res<Vec<(Metric, u64)>> {
        let mut counts = Vec::with_capacity(Metric::ALL.len());
        for metric in Metric::ALL {
            counts.push((metric, self.get_current_count(user_id, metric).await?));
        }
        Ok(counts)
    }

    /// Adds `amount` unconditionally and returns the new count.
    pub async fn record_usage(&self, user_id: Uuid, metric: Metric, amount: u64) -> Res<u64> {
        check_amount(amount)?;
        let outcome = self
            .with_retry("record", || {
                self.store
                    .increment(user_id, metric, amount, None, self.clock.now())
            })
            .await?;
        Ok(outcome.counter().count)
    }

    /// Adds `amount` only if the count stays within `quota`.
    ///
    /// Check and increment are one atomic store operation, so concurrent
    /// callers can never push the count past the quota between them.
    pub async fn consume_within(
        &self,
        user_id: Uuid,
        metric: Metric,
        amount: u64,
        quota: Quota,
    ) -> Res<Increment> {
        check_amount(amount)?;
        let outcome = self
            .with_retry("consume", || {
                self.store
                    .increment(user_id, metric, amount, quota.limit(), self.clock.now())
            })
            .await?;

        if !outcome.is_applied() {
            log::debug!(
                "Quota {} reached for user {} on {} (count {})",
                quota,
                user_id,
                metric,
                outcome.counter().count
            );
        }
        Ok(outcome)
    }

    /// Applies the period reset if it is due. Calling it again within the
    /// same period changes nothing.
    pub async fn period_reset(&self, user_id: Uuid, metric: Metric) -> Res<Option<UsageCounter>> {
        self.with_retry("reset", || self.store.current(user_id, metric, self.clock.now()))
            .await
    }

    async fn with_retry<T, F, Fut>(&self, op: &str, call: F) -> Res<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Res<T>>,
    {
        match call().await {
            Err(err) if err.is_transient() => {
                log::warn!(
                    "Usage store '{}' failed on {}: {}. Retrying in {:?}",
                    self.store.name(),
                    op,
                    err,
                    self.retry_backoff
                );
                tokio::time::sleep(self.retry_backoff).await;
                call().await.inspect_err(|err| {
                    log::error!(
                        "Usage store '{}' failed on {} after retry: {}",
                        self.store.name(),
                        op,
                        err
                    );
                })
            }
            result => result,
        }
    }
}

/// Counters are BIGINT in Postgres and signed integers in Redis, so an
/// amount must be positive and fit in an `i64` on every backend.
fn check_amount(amount: u64) -> Res<()> {
    if amount == 0 {
        return Err(AppError::BadRequest("Usage amount must be positive".to_string()));
    }
    if amount > i64::MAX as u64 {
        return Err(AppError::BadRequest(format!(
            "Usage amount {} exceeds the maximum of {}",
            amount,
            i64::MAX
        )));
    }
    Ok(())
}
