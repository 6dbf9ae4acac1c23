use serde::Serialize;

use super::tier::{EntitlementRecord, SupportClass, TemplateAccess};

/// Boolean capabilities a tier may or may not grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    CoverLetters,
    NoWatermark,
    AllTemplates,
    PremiumTemplates,
    PrioritySupport,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::CoverLetters,
        Feature::NoWatermark,
        Feature::AllTemplates,
        Feature::PremiumTemplates,
        Feature::PrioritySupport,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Feature::CoverLetters => "coverLetters",
            Feature::NoWatermark => "noWatermark",
            Feature::AllTemplates => "allTemplates",
            Feature::PremiumTemplates => "premiumTemplates",
            Feature::PrioritySupport => "prioritySupport",
        }
    }

    /// `None` for keys outside the feature map.
    pub fn from_key(key: &str) -> Option<Feature> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    pub fn granted_by(&self, record: &EntitlementRecord) -> bool {
        match self {
            Feature::CoverLetters => record.cover_letters_enabled,
            Feature::NoWatermark => !record.watermark_required,
            Feature::AllTemplates => record.template_access >= TemplateAccess::All,
            Feature::PremiumTemplates => record.template_access >= TemplateAccess::Premium,
            Feature::PrioritySupport => record.support_class >= SupportClass::Priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_resolve_back_to_features() {
        for feature in Feature::ALL {
            assert_eq!(Feature::from_key(feature.key()), Some(feature));
        }
        assert_eq!(Feature::from_key("CoverLetters"), None);
    }
}
