use common::error::Res;

use crate::models::tier::{
    EntitlementRecord, Quota, SubscriptionTier, SupportClass, TemplateAccess,
};

/// Entitlements per tier, indexed in `SubscriptionTier::ALL` order.
static CATALOG: [EntitlementRecord; 4] = [
    EntitlementRecord {
        tier: SubscriptionTier::Free,
        quota: Quota::Limited(1),
        template_access: TemplateAccess::Basic,
        cover_letters_enabled: false,
        watermark_required: true,
        support_class: SupportClass::Community,
    },
    EntitlementRecord {
        tier: SubscriptionTier::Basic,
        quota: Quota::Limited(10),
        template_access: TemplateAccess::All,
        cover_letters_enabled: true,
        watermark_required: false,
        support_class: SupportClass::Email,
    },
    EntitlementRecord {
        tier: SubscriptionTier::Professional,
        quota: Quota::Unlimited,
        template_access: TemplateAccess::Premium,
        cover_letters_enabled: true,
        watermark_required: false,
        support_class: SupportClass::Priority,
    },
    EntitlementRecord {
        tier: SubscriptionTier::Enterprise,
        quota: Quota::Unlimited,
        template_access: TemplateAccess::Premium,
        cover_letters_enabled: true,
        watermark_required: false,
        support_class: SupportClass::Dedicated,
    },
];

pub fn record(tier: SubscriptionTier) -> &'static EntitlementRecord {
    &CATALOG[tier as usize]
}

/// Looks up a tier by identifier. Anything outside the catalog is an
/// `UnknownTier` error, never a default record.
pub fn lookup(tier_id: &str) -> Res<&'static EntitlementRecord> {
    tier_id.parse::<SubscriptionTier>().map(record)
}

pub fn all() -> &'static [EntitlementRecord] {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use common::error::AppError;

    use super::*;

    #[test]
    fn table_is_indexed_by_tier() {
        for tier in SubscriptionTier::ALL {
            assert_eq!(record(tier).tier, tier);
        }
    }

    #[test]
    fn lookup_is_total_over_known_ids() {
        assert_eq!(lookup("free").unwrap().quota, Quota::Limited(1));
        assert_eq!(lookup("professional").unwrap().quota, Quota::Unlimited);
        assert!(lookup("enterprise").unwrap().cover_letters_enabled);
    }

    #[test]
    fn lookup_rejects_unknown_ids() {
        for id in ["", "pro", "Free", "platinum"] {
            assert!(matches!(lookup(id), Err(AppError::UnknownTier(_))), "{id}");
        }
    }

    #[test]
    fn higher_tiers_never_grant_less() {
        for pair in CATALOG.windows(2) {
            let (lower, higher) = (&pair[0], &pair[1]);
            assert!(higher.template_access >= lower.template_access);
            assert!(higher.support_class >= lower.support_class);
            assert!(higher.cover_letters_enabled || !lower.cover_letters_enabled);
            assert!(!higher.watermark_required || lower.watermark_required);
        }
    }
}
