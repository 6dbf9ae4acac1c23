//! Store doubles for exercising failure handling.

use std::sync::atomic::{AtomicUsize, Ordering};

use api_tiers::Metric;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use uuid::Uuid;

use crate::{
    counter::{Increment, UsageCounter, UsageStore},
    stores::memory::MemoryStore,
};

/// Memory store that fails its next `n` calls with `StorageUnavailable`.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failures_left: AtomicUsize,
    calls: AtomicUsize,
}

impl FlakyStore {
    pub fn failing(n: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(n),
            ..Self::default()
        }
    }

    pub fn always_failing() -> Self {
        Self::failing(usize::MAX)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Res<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(AppError::StorageUnavailable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UsageStore for FlakyStore {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn current(
        &self,
        user_id: Uuid,
        metric: Metric,
        now: DateTime<Utc>,
    ) -> Res<Option<UsageCounter>> {
        self.check()?;
        self.inner.current(user_id, metric, now).await
    }

    async fn increment(
        &self,
        user_id: Uuid,
        metric: Metric,
        amount: u64,
        limit: Option<u64>,
        now: DateTime<Utc>,
    ) -> Res<Increment> {
        self.check()?;
        self.inner.increment(user_id, metric, amount, limit, now).await
    }
}
