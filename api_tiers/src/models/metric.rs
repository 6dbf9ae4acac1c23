use std::{fmt, str::FromStr};

use common::error::{AppError, Res};
use serde::{Deserialize, Serialize};

use super::{
    feature::Feature,
    tier::{EntitlementRecord, Quota},
};

/// A metered action whose usage is counted per user per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Primary artifact; capped by the tier quota.
    Resumes,
    /// Counted, gated by the `coverLetters` feature, uncapped once granted.
    CoverLetters,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Resumes, Metric::CoverLetters];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Resumes => "resumes",
            Metric::CoverLetters => "cover_letters",
        }
    }

    pub fn quota_for(&self, record: &EntitlementRecord) -> Quota {
        match self {
            Metric::Resumes => record.quota,
            Metric::CoverLetters => Quota::Unlimited,
        }
    }

    /// Feature a tier must grant before this action is counted at all.
    pub fn required_feature(&self) -> Option<Feature> {
        match self {
            Metric::Resumes => None,
            Metric::CoverLetters => Some(Feature::CoverLetters),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = AppError;

    fn from_str(s: &str) -> Res<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown metric '{}'", s)))
    }
}
