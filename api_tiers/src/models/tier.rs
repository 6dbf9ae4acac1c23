use std::{fmt, str::FromStr};

use common::error::{AppError, Res};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

use crate::services::catalog;

/// Subscription level assigned to a user.
///
/// Variants are declared in ascending order, so `Ord` gives the upgrade
/// path: `Free < Basic < Professional < Enterprise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Basic,
    Professional,
    Enterprise,
}

impl SubscriptionTier {
    /// Every tier, lowest first.
    pub const ALL: [SubscriptionTier; 4] = [
        SubscriptionTier::Free,
        SubscriptionTier::Basic,
        SubscriptionTier::Professional,
        SubscriptionTier::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Basic => "basic",
            SubscriptionTier::Professional => "professional",
            SubscriptionTier::Enterprise => "enterprise",
        }
    }

    pub fn entitlements(self) -> &'static EntitlementRecord {
        catalog::record(self)
    }

    /// Tiers strictly above this one, lowest first.
    pub fn upgrades(self) -> impl Iterator<Item = SubscriptionTier> {
        Self::ALL.into_iter().filter(move |t| *t > self)
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse of the canonical vocabulary. Legacy ids such as `pro`
/// are rejected here and must go through [`LegacyTier`].
impl FromStr for SubscriptionTier {
    type Err = AppError;

    fn from_str(s: &str) -> Res<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::UnknownTier(s.to_string()))
    }
}

/// The three-tier vocabulary (`free | pro | enterprise`) still found in
/// older persisted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyTier {
    Free,
    Pro,
    Enterprise,
}

impl LegacyTier {
    pub fn migrate(self) -> SubscriptionTier {
        let tier = match self {
            LegacyTier::Free => SubscriptionTier::Free,
            LegacyTier::Pro => SubscriptionTier::Professional,
            LegacyTier::Enterprise => SubscriptionTier::Enterprise,
        };
        log::info!("Migrated legacy tier {:?} to '{}'", self, tier);
        tier
    }

    /// Parses a legacy id and maps it onto the canonical vocabulary.
    pub fn migrate_id(raw: &str) -> Res<SubscriptionTier> {
        raw.parse::<LegacyTier>().map(LegacyTier::migrate)
    }
}

impl FromStr for LegacyTier {
    type Err = AppError;

    fn from_str(s: &str) -> Res<Self> {
        match s {
            "free" => Ok(LegacyTier::Free),
            "pro" => Ok(LegacyTier::Pro),
            "enterprise" => Ok(LegacyTier::Enterprise),
            other => Err(AppError::UnknownTier(other.to_string())),
        }
    }
}

/// Template classes, ordered so that higher access subsumes lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateAccess {
    Basic,
    All,
    Premium,
}

impl TemplateAccess {
    pub const ALL: [TemplateAccess; 3] =
        [TemplateAccess::Basic, TemplateAccess::All, TemplateAccess::Premium];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateAccess::Basic => "basic",
            TemplateAccess::All => "all",
            TemplateAccess::Premium => "premium",
        }
    }
}

impl FromStr for TemplateAccess {
    type Err = AppError;

    fn from_str(s: &str) -> Res<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown template class '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportClass {
    Community,
    Email,
    Priority,
    Dedicated,
}

/// Monthly allowance for a metered action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quota {
    Limited(u64),
    Unlimited,
}

impl Quota {
    /// True while `used` is strictly below the limit. A zero quota never allows.
    pub fn allows(&self, used: u64) -> bool {
        match self {
            Quota::Unlimited => true,
            Quota::Limited(limit) => used < *limit,
        }
    }

    pub fn remaining(&self, used: u64) -> Quota {
        match self {
            Quota::Unlimited => Quota::Unlimited,
            Quota::Limited(limit) => Quota::Limited(limit.saturating_sub(used)),
        }
    }

    /// The cap handed to conditional increments; `None` means uncapped.
    pub fn limit(&self) -> Option<u64> {
        match self {
            Quota::Unlimited => None,
            Quota::Limited(limit) => Some(*limit),
        }
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quota::Unlimited => f.write_str("unlimited"),
            Quota::Limited(limit) => write!(f, "{}", limit),
        }
    }
}

impl Serialize for Quota {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Quota::Unlimited => serializer.serialize_str("unlimited"),
            Quota::Limited(limit) => serializer.serialize_u64(*limit),
        }
    }
}

impl<'de> Deserialize<'de> for Quota {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u64),
            Word(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Count(limit) => Ok(Quota::Limited(limit)),
            Raw::Word(word) if word == "unlimited" => Ok(Quota::Unlimited),
            Raw::Word(word) => Err(D::Error::custom(format!(
                "expected a number or \"unlimited\", got \"{}\"",
                word
            ))),
        }
    }
}

/// Everything a tier grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementRecord {
    pub tier: SubscriptionTier,
    /// Resumes per calendar month.
    pub quota: Quota,
    pub template_access: TemplateAccess,
    pub cover_letters_enabled: bool,
    pub watermark_required: bool,
    pub support_class: SupportClass,
}
