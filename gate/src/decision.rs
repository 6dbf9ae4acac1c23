use std::{fmt, str::FromStr};

use actix_web::HttpResponse;
use api_tiers::{Metric, Quota, SubscriptionTier, TemplateAccess};
use common::error::{AppError, Res};
use serde::Serialize;

/// Something a user asks to do that a tier may or may not permit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatedAction {
    /// Create one unit of a metered artifact.
    Create(Metric),
    /// Use a template of the given class.
    Template(TemplateAccess),
    /// Use a flagged feature, by feature key.
    Feature(String),
}

impl GatedAction {
    /// Parses `create:<metric>`, `template:<class>` or a bare feature key.
    pub fn from_key(key: &str) -> Res<Self> {
        if let Some(metric) = key.strip_prefix("create:") {
            return Ok(GatedAction::Create(metric.parse()?));
        }
        if let Some(class) = key.strip_prefix("template:") {
            return Ok(GatedAction::Template(class.parse()?));
        }
        if key.is_empty() {
            return Err(AppError::BadRequest("Empty gate key".to_string()));
        }
        Ok(GatedAction::Feature(key.to_string()))
    }
}

impl FromStr for GatedAction {
    type Err = AppError;

    fn from_str(s: &str) -> Res<Self> {
        Self::from_key(s)
    }
}

impl fmt::Display for GatedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatedAction::Create(metric) => write!(f, "create:{}", metric),
            GatedAction::Template(class) => write!(f, "template:{}", class.as_str()),
            GatedAction::Feature(key) => f.write_str(key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DenialReason {
    #[serde(rename = "denied_by_quota")]
    Quota,
    #[serde(rename = "denied_by_tier")]
    Tier,
    #[serde(rename = "denied_by_flag")]
    Flag,
    /// Usage could not be checked, so the action was refused.
    #[serde(rename = "usage_store_unavailable")]
    Unavailable,
}

/// Result of a gate check. A denial is an ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_target: Option<SubscriptionTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<Quota>,
}

impl GateDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            upgrade_target: None,
            message: None,
            used: None,
            remaining: None,
        }
    }

    pub fn deny(
        reason: DenialReason,
        upgrade_target: Option<SubscriptionTier>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            upgrade_target,
            message: Some(message.into()),
            used: None,
            remaining: None,
        }
    }

    pub fn with_usage(mut self, used: u64, quota: Quota) -> Self {
        self.used = Some(used);
        self.remaining = Some(quota.remaining(used));
        self
    }

    /// Response a route guard sends for a denial.
    pub fn to_http_response(&self) -> HttpResponse {
        let mut builder = match self.reason {
            None => HttpResponse::Ok(),
            Some(DenialReason::Quota) => HttpResponse::PaymentRequired(),
            Some(DenialReason::Tier) | Some(DenialReason::Flag) => HttpResponse::Forbidden(),
            Some(DenialReason::Unavailable) => HttpResponse::ServiceUnavailable(),
        };
        builder.json(serde_json::json!({
            "error": self.message,
            "reason": self.reason,
            "upgradeTarget": self.upgrade_target,
        }))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;

    use super::*;

    #[test]
    fn parses_gate_keys() {
        assert_eq!(
            GatedAction::from_key("create:resumes").unwrap(),
            GatedAction::Create(Metric::Resumes)
        );
        assert_eq!(
            GatedAction::from_key("template:premium").unwrap(),
            GatedAction::Template(TemplateAccess::Premium)
        );
        assert_eq!(
            GatedAction::from_key("noWatermark").unwrap(),
            GatedAction::Feature("noWatermark".to_string())
        );
        assert!(GatedAction::from_key("create:invoices").is_err());
        assert!(GatedAction::from_key("template:gold").is_err());
    }

    #[test]
    fn display_matches_key_format() {
        for key in ["create:cover_letters", "template:all", "coverLetters"] {
            assert_eq!(GatedAction::from_key(key).unwrap().to_string(), key);
        }
    }

    #[test]
    fn denial_statuses() {
        let quota = GateDecision::deny(DenialReason::Quota, Some(SubscriptionTier::Basic), "x");
        assert_eq!(quota.to_http_response().status(), StatusCode::PAYMENT_REQUIRED);

        let flag = GateDecision::deny(DenialReason::Flag, None, "x");
        assert_eq!(flag.to_http_response().status(), StatusCode::FORBIDDEN);

        let down = GateDecision::deny(DenialReason::Unavailable, None, "x");
        assert_eq!(down.to_http_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn denial_serializes_reason_codes() {
        let decision = GateDecision::deny(
            DenialReason::Tier,
            Some(SubscriptionTier::Professional),
            "Premium templates need a higher tier",
        );
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["reason"], "denied_by_tier");
        assert_eq!(json["upgradeTarget"], "professional");
        assert!(json.get("used").is_none());
    }
}
