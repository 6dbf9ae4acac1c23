//! Feature-gating questions answered from the tier catalog alone.
//!
//! Nothing here touches usage counters or mutates state; callers pass in
//! whatever usage they have already read.

use crate::models::{
    feature::Feature,
    metric::Metric,
    tier::{Quota, SubscriptionTier, TemplateAccess},
};

/// True iff the tier's quota is unlimited or `current_usage_count` is below it.
pub fn can_perform_action(tier: SubscriptionTier, current_usage_count: u64) -> bool {
    tier.entitlements().quota.allows(current_usage_count)
}

pub fn can_access_template(tier: SubscriptionTier, class: TemplateAccess) -> bool {
    class <= tier.entitlements().template_access
}

/// Whether `feature_key` is locked for `tier`.
///
/// Keys outside the feature map resolve to `false`: unknown feature flags
/// fail open. Callers that need a hard deny must use a known key.
pub fn requires_upgrade(tier: SubscriptionTier, feature_key: &str) -> bool {
    match Feature::from_key(feature_key) {
        Some(feature) => !feature.granted_by(tier.entitlements()),
        None => {
            log::debug!(
                "Feature key '{}' is not gated, treating as available for tier '{}'",
                feature_key,
                tier
            );
            false
        }
    }
}

pub fn watermark_required(tier: SubscriptionTier) -> bool {
    tier.entitlements().watermark_required
}

pub fn remaining_quota(tier: SubscriptionTier, current_usage_count: u64) -> Quota {
    tier.entitlements().quota.remaining(current_usage_count)
}

// --- Upgrade targets ---

pub fn minimum_tier_for_feature(feature: Feature) -> Option<SubscriptionTier> {
    SubscriptionTier::ALL
        .into_iter()
        .find(|t| feature.granted_by(t.entitlements()))
}

pub fn minimum_tier_for_template(class: TemplateAccess) -> Option<SubscriptionTier> {
    SubscriptionTier::ALL
        .into_iter()
        .find(|t| can_access_template(*t, class))
}

/// Lowest tier that would still allow `metric` after `current_usage_count` uses.
pub fn minimum_tier_for_usage(metric: Metric, current_usage_count: u64) -> Option<SubscriptionTier> {
    SubscriptionTier::ALL.into_iter().find(|t| {
        let record = t.entitlements();
        metric
            .required_feature()
            .is_none_or(|feature| feature.granted_by(record))
            && metric.quota_for(record).allows(current_usage_count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tier_allows_exactly_one_resume() {
        assert!(can_perform_action(SubscriptionTier::Free, 0));
        assert!(!can_perform_action(SubscriptionTier::Free, 1));
        assert!(!can_perform_action(SubscriptionTier::Free, 2));
    }

    #[test]
    fn professional_is_unlimited() {
        for used in [0, 1, 1000] {
            assert!(can_perform_action(SubscriptionTier::Professional, used));
        }
    }

    #[test]
    fn zero_quota_always_denies() {
        for used in [0, 1, u64::MAX] {
            assert!(!Quota::Limited(0).allows(used));
        }
    }

    #[test]
    fn cover_letters_need_an_upgrade_on_free_only() {
        assert!(requires_upgrade(SubscriptionTier::Free, "coverLetters"));
        assert!(!requires_upgrade(SubscriptionTier::Basic, "coverLetters"));
        assert!(!requires_upgrade(SubscriptionTier::Professional, "coverLetters"));
    }

    #[test]
    fn watermark_removal_is_a_paid_feature() {
        assert!(requires_upgrade(SubscriptionTier::Free, "noWatermark"));
        assert!(!requires_upgrade(SubscriptionTier::Basic, "noWatermark"));
    }

    /// Unknown feature keys fail open. This is a deliberate choice carried
    /// over from the product: a typo in a flag name unlocks the feature
    /// instead of locking every tier out of it.
    #[test]
    fn unknown_feature_key_does_not_require_upgrade() {
        assert!(!requires_upgrade(SubscriptionTier::Free, "xyz"));
        assert!(!requires_upgrade(SubscriptionTier::Free, ""));
    }

    #[test]
    fn template_access_per_tier() {
        assert!(can_access_template(SubscriptionTier::Free, TemplateAccess::Basic));
        assert!(!can_access_template(SubscriptionTier::Free, TemplateAccess::All));
        assert!(can_access_template(SubscriptionTier::Basic, TemplateAccess::All));
        assert!(!can_access_template(SubscriptionTier::Basic, TemplateAccess::Premium));
        assert!(can_access_template(SubscriptionTier::Enterprise, TemplateAccess::Premium));
    }

    #[test]
    fn upgrade_targets_are_the_lowest_satisfying_tier() {
        assert_eq!(
            minimum_tier_for_feature(Feature::CoverLetters),
            Some(SubscriptionTier::Basic)
        );
        assert_eq!(
            minimum_tier_for_feature(Feature::PrioritySupport),
            Some(SubscriptionTier::Professional)
        );
        assert_eq!(
            minimum_tier_for_template(TemplateAccess::Premium),
            Some(SubscriptionTier::Professional)
        );
        assert_eq!(
            minimum_tier_for_usage(Metric::Resumes, 1),
            Some(SubscriptionTier::Basic)
        );
        assert_eq!(
            minimum_tier_for_usage(Metric::Resumes, 10),
            Some(SubscriptionTier::Professional)
        );
        assert_eq!(
            minimum_tier_for_usage(Metric::CoverLetters, 0),
            Some(SubscriptionTier::Basic)
        );
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    fn arb_tier() -> impl Strategy<Value = SubscriptionTier> {
        prop::sample::select(SubscriptionTier::ALL.to_vec())
    }

    fn arb_class() -> impl Strategy<Value = TemplateAccess> {
        prop::sample::select(TemplateAccess::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn at_quota_denies(tier in arb_tier()) {
            if let Quota::Limited(limit) = tier.entitlements().quota {
                prop_assert!(!can_perform_action(tier, limit));
                prop_assert!(!can_perform_action(tier, limit.saturating_add(1)));
            }
        }

        #[test]
        fn unlimited_always_allows(tier in arb_tier(), used in any::<u64>()) {
            if tier.entitlements().quota == Quota::Unlimited {
                prop_assert!(can_perform_action(tier, used));
            }
        }

        #[test]
        fn template_access_is_monotonic(tier in arb_tier(), class in arb_class(), lower in arb_class()) {
            if can_access_template(tier, class) && lower <= class {
                prop_assert!(can_access_template(tier, lower));
            }
        }

        #[test]
        fn evaluation_is_deterministic(tier in arb_tier(), key in "[a-zA-Z]{0,16}") {
            prop_assert_eq!(requires_upgrade(tier, &key), requires_upgrade(tier, &key));
        }

        #[test]
        fn upgrade_target_satisfies_the_request(used in 0u64..50) {
            if let Some(target) = minimum_tier_for_usage(Metric::Resumes, used) {
                prop_assert!(can_perform_action(target, used));
                for lower in SubscriptionTier::ALL.into_iter().filter(|t| *t < target) {
                    prop_assert!(!can_perform_action(lower, used));
                }
            }
        }
    }
}
