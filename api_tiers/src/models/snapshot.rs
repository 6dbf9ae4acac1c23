use serde::Serialize;

use super::{
    metric::Metric,
    tier::{EntitlementRecord, Quota, SubscriptionTier},
};
use crate::services::evaluator;

/// What a user may do right now. Derived from the tier and current
/// counters on every request and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementSnapshot {
    pub tier: SubscriptionTier,
    pub entitlements: EntitlementRecord,
    pub usage: Vec<MetricUsage>,
    pub watermark: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricUsage {
    pub metric: Metric,
    pub used: u64,
    pub quota: Quota,
    pub remaining: Quota,
    pub allowed: bool,
}

impl EntitlementSnapshot {
    pub fn compute(tier: SubscriptionTier, counts: impl IntoIterator<Item = (Metric, u64)>) -> Self {
        let entitlements = *tier.entitlements();
        let usage = counts
            .into_iter()
            .map(|(metric, used)| {
                let quota = metric.quota_for(&entitlements);
                let feature_ok = metric
                    .required_feature()
                    .is_none_or(|feature| feature.granted_by(&entitlements));
                MetricUsage {
                    metric,
                    used,
                    quota,
                    remaining: quota.remaining(used),
                    allowed: feature_ok && quota.allows(used),
                }
            })
            .collect();

        EntitlementSnapshot {
            tier,
            entitlements,
            usage,
            watermark: evaluator::watermark_required(tier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_snapshot_after_first_resume() {
        let snapshot = EntitlementSnapshot::compute(
            SubscriptionTier::Free,
            [(Metric::Resumes, 1), (Metric::CoverLetters, 0)],
        );

        assert!(snapshot.watermark);
        let resumes = &snapshot.usage[0];
        assert_eq!(resumes.remaining, Quota::Limited(0));
        assert!(!resumes.allowed);
        // cover letters are not part of the free tier at all
        assert!(!snapshot.usage[1].allowed);
    }

    #[test]
    fn professional_snapshot_is_unbounded() {
        let snapshot =
            EntitlementSnapshot::compute(SubscriptionTier::Professional, [(Metric::Resumes, 250)]);

        assert!(!snapshot.watermark);
        assert_eq!(snapshot.usage[0].remaining, Quota::Unlimited);
        assert!(snapshot.usage[0].allowed);
    }
}
