use api_tiers::{
    Feature, Metric, SubscriptionTier, TemplateAccess,
    services::evaluator,
};
use common::{
    env_config::FailurePolicy,
    error::{AppError, Res},
};
use usage::{Increment, UsageAccountant};
use uuid::Uuid;

use crate::decision::{DenialReason, GateDecision, GatedAction};

/// Combines the entitlement evaluator with the usage accountant. Holds no
/// state of its own.
#[derive(Clone)]
pub struct Gate {
    accountant: UsageAccountant,
    read_policy: FailurePolicy,
}

impl Gate {
    pub fn new(accountant: UsageAccountant, read_policy: FailurePolicy) -> Self {
        Self {
            accountant,
            read_policy,
        }
    }

    pub fn accountant(&self) -> &UsageAccountant {
        &self.accountant
    }

    /// Same as [`Gate::evaluate_gate`] for an unvalidated tier id.
    pub async fn evaluate_gate_for(
        &self,
        user_id: Uuid,
        tier_id: &str,
        action: &GatedAction,
    ) -> Res<GateDecision> {
        let tier = tier_id.parse::<SubscriptionTier>()?;
        self.evaluate_gate(user_id, tier, action).await
    }

    /// Answers whether `action` would be allowed right now, without
    /// consuming anything.
    ///
    /// If usage cannot be read, the configured read policy decides.
    pub async fn evaluate_gate(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
        action: &GatedAction,
    ) -> Res<GateDecision> {
        match action {
            GatedAction::Create(metric) => {
                if let Some(denied) = Self::check_metric_feature(tier, *metric) {
                    return Ok(denied);
                }
                let quota = metric.quota_for(tier.entitlements());
                match self.accountant.get_current_count(user_id, *metric).await {
                    Ok(used) if quota.allows(used) => Ok(GateDecision::allow().with_usage(used, quota)),
                    Ok(used) => Ok(Self::quota_denial(tier, *metric, used).with_usage(used, quota)),
                    Err(AppError::StorageUnavailable(e)) => match self.read_policy {
                        FailurePolicy::FailOpen => {
                            log::warn!(
                                "Usage store unavailable, allowing {} for {} by policy: {}",
                                action,
                                user_id,
                                e
                            );
                            Ok(GateDecision::allow())
                        }
                        FailurePolicy::FailClosed => Ok(Self::unavailable(user_id, action, &e)),
                    },
                    Err(e) => Err(e),
                }
            }
            GatedAction::Template(class) => Ok(Self::check_template(tier, *class)),
            GatedAction::Feature(key) => Ok(Self::check_feature(tier, key)),
        }
    }

    /// Checks `action` and, for metered actions, consumes one unit in the
    /// same atomic step. Usage store failures always deny.
    pub async fn enforce_gate(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
        action: &GatedAction,
    ) -> Res<GateDecision> {
        let GatedAction::Create(metric) = action else {
            return self.evaluate_gate(user_id, tier, action).await;
        };

        if let Some(denied) = Self::check_metric_feature(tier, *metric) {
            return Ok(denied);
        }
        let quota = metric.quota_for(tier.entitlements());

        match self.accountant.consume_within(user_id, *metric, 1, quota).await {
            Ok(Increment::Applied(counter)) => {
                Ok(GateDecision::allow().with_usage(counter.count, quota))
            }
            Ok(Increment::Rejected(counter)) => {
                Ok(Self::quota_denial(tier, *metric, counter.count).with_usage(counter.count, quota))
            }
            Err(AppError::StorageUnavailable(e)) => Ok(Self::unavailable(user_id, action, &e)),
            Err(e) => Err(e),
        }
    }

    fn check_metric_feature(tier: SubscriptionTier, metric: Metric) -> Option<GateDecision> {
        let feature = metric.required_feature()?;
        if feature.granted_by(tier.entitlements()) {
            return None;
        }
        Some(Self::flag_denial(tier, feature))
    }

    fn check_template(tier: SubscriptionTier, class: TemplateAccess) -> GateDecision {
        if evaluator::can_access_template(tier, class) {
            return GateDecision::allow();
        }
        let target = evaluator::minimum_tier_for_template(class);
        GateDecision::deny(
            DenialReason::Tier,
            target,
            format!(
                "{} templates are not included in the {} tier{}",
                class.as_str(),
                tier,
                upgrade_hint(target)
            ),
        )
    }

    fn check_feature(tier: SubscriptionTier, key: &str) -> GateDecision {
        if !evaluator::requires_upgrade(tier, key) {
            return GateDecision::allow();
        }
        match Feature::from_key(key) {
            Some(feature) => Self::flag_denial(tier, feature),
            // requires_upgrade is false for unknown keys
            None => GateDecision::allow(),
        }
    }

    fn flag_denial(tier: SubscriptionTier, feature: Feature) -> GateDecision {
        let target = evaluator::minimum_tier_for_feature(feature);
        GateDecision::deny(
            DenialReason::Flag,
            target,
            format!(
                "'{}' is not available on the {} tier{}",
                feature.key(),
                tier,
                upgrade_hint(target)
            ),
        )
    }

    fn quota_denial(tier: SubscriptionTier, metric: Metric, used: u64) -> GateDecision {
        let target = evaluator::minimum_tier_for_usage(metric, used);
        GateDecision::deny(
            DenialReason::Quota,
            target,
            format!(
                "Monthly {} quota of the {} tier is used up ({} of {}){}",
                metric,
                tier,
                used,
                metric.quota_for(tier.entitlements()),
                upgrade_hint(target)
            ),
        )
    }

    fn unavailable(user_id: Uuid, action: &GatedAction, error: &str) -> GateDecision {
        log::error!(
            "Denying {} for {}: usage store unavailable: {}",
            action,
            user_id,
            error
        );
        GateDecision::deny(
            DenialReason::Unavailable,
            None,
            "Usage could not be verified, please try again shortly",
        )
    }
}

fn upgrade_hint(target: Option<SubscriptionTier>) -> String {
    target
        .map(|t| format!("; upgrade to {} to continue", t))
        .unwrap_or_default()
}
