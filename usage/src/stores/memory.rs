use api_tiers::Metric;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::Res;
use dashmap::DashMap;
use uuid::Uuid;

use crate::counter::{Increment, UsageCounter, UsageStore};

/// Counters held in a `DashMap`. Each operation runs under the shard lock
/// of its `(user, metric)` entry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    counters: DashMap<(Uuid, Metric), UsageCounter>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn current(
        &self,
        user_id: Uuid,
        metric: Metric,
        now: DateTime<Utc>,
    ) -> Res<Option<UsageCounter>> {
        Ok(self.counters.get_mut(&(user_id, metric)).map(|mut counter| {
            counter.roll(now);
            counter.clone()
        }))
    }

    async fn increment(
        &self,
        user_id: Uuid,
        metric: Metric,
        amount: u64,
        limit: Option<u64>,
        now: DateTime<Utc>,
    ) -> Res<Increment> {
        let mut counter = self
            .counters
            .entry((user_id, metric))
            .or_insert_with(|| UsageCounter::fresh(user_id, metric, now));
        counter.roll(now);

        let next = counter.count.saturating_add(amount);
        if limit.is_some_and(|limit| next > limit) {
            return Ok(Increment::Rejected(counter.clone()));
        }
        counter.count = next;
        Ok(Increment::Applied(counter.clone()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 20, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn missing_counter_is_none() {
        let store = MemoryStore::new();
        let counter = store.current(Uuid::new_v4(), Metric::Resumes, now()).await.unwrap();
        assert!(counter.is_none());
    }

    #[tokio::test]
    async fn increment_respects_limit() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        let first = store.increment(user, Metric::Resumes, 1, Some(1), now()).await.unwrap();
        assert!(first.is_applied());
        assert_eq!(first.counter().count, 1);

        let second = store.increment(user, Metric::Resumes, 1, Some(1), now()).await.unwrap();
        assert!(!second.is_applied());
        assert_eq!(second.counter().count, 1);
    }

    #[tokio::test]
    async fn metrics_are_counted_separately() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        store.increment(user, Metric::Resumes, 2, None, now()).await.unwrap();
        store.increment(user, Metric::CoverLetters, 5, None, now()).await.unwrap();

        let resumes = store.current(user, Metric::Resumes, now()).await.unwrap().unwrap();
        assert_eq!(resumes.count, 2);
    }
}
