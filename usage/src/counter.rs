use api_tiers::Metric;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::Res;
use serde::Serialize;
use uuid::Uuid;

use crate::period;

/// Per-user, per-metric count for one quota period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounter {
    pub user_id: Uuid,
    pub metric: Metric,
    pub count: u64,
    pub period_reset_at: DateTime<Utc>,
}

impl UsageCounter {
    pub fn fresh(user_id: Uuid, metric: Metric, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            metric,
            count: 0,
            period_reset_at: period::next_reset(now),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.period_reset_at
    }

    /// Zeroes the counter and moves the reset past `now`. No-op when not due.
    pub fn roll(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.count = 0;
        self.period_reset_at = period::next_reset(now);
        true
    }
}

/// Outcome of a conditional increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Increment {
    Applied(UsageCounter),
    /// The limit would have been exceeded; the counter was left untouched.
    Rejected(UsageCounter),
}

impl Increment {
    pub fn counter(&self) -> &UsageCounter {
        match self {
            Increment::Applied(c) | Increment::Rejected(c) => c,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Increment::Applied(_))
    }
}

/// Backing storage for usage counters.
///
/// Both operations are a single atomic read-modify-write in the backend:
/// a due period reset, the limit check and the increment can never be
/// interleaved with another caller's. Backend failures are reported as
/// `AppError::StorageUnavailable`.
#[async_trait]
pub trait UsageStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Current-period counter, after applying a due reset. `None` if the
    /// counter was never created.
    async fn current(
        &self,
        user_id: Uuid,
        metric: Metric,
        now: DateTime<Utc>,
    ) -> Res<Option<UsageCounter>>;

    /// Adds `amount`, creating the counter if needed, unless the result would
    /// exceed `limit`.
    async fn increment(
        &self,
        user_id: Uuid,
        metric: Metric,
        amount: u64,
        limit: Option<u64>,
        now: DateTime<Utc>,
    ) -> Res<Increment>;
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn roll_only_when_due() {
        let start = Utc.with_ymd_and_hms(2025, 5, 10, 0, 0, 0).unwrap();
        let mut counter = UsageCounter::fresh(Uuid::new_v4(), Metric::Resumes, start);
        counter.count = 4;

        assert!(!counter.roll(start));
        assert_eq!(counter.count, 4);

        let june = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        assert!(counter.roll(june));
        assert_eq!(counter.count, 0);
        assert_eq!(
            counter.period_reset_at,
            Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn long_idle_counter_skips_to_current_period() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let mut counter = UsageCounter::fresh(Uuid::new_v4(), Metric::Resumes, start);

        let later = Utc.with_ymd_and_hms(2025, 9, 3, 8, 0, 0).unwrap();
        assert!(counter.roll(later));
        assert_eq!(
            counter.period_reset_at,
            Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap()
        );
    }
}
