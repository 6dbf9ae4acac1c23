use actix_web::{Responder, get, post, web};
use api_tiers::{EntitlementSnapshot, Metric, Quota};
use common::{error::Res, http::Success};
use serde::Serialize;

use crate::{decision::GatedAction, middleware::auth::AuthUser, service::Gate};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub metric: Metric,
    pub used: u64,
    pub quota: Quota,
    pub remaining: Quota,
}

/// Returns the caller's entitlement snapshot: tier record, usage per
/// metric for the current month and whether exports are watermarked.
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/entitlements', {
///   headers: { 'Authorization': `Bearer ${token}` }
/// });
/// const snapshot = await response.json();
/// // snapshot.usage[0] => { metric: "resumes", used: 1, quota: 1, remaining: 0, allowed: false }
/// ```
#[get("/entitlements")]
pub async fn get_entitlements(
    user: web::ReqData<AuthUser>,
    gate: web::Data<Gate>,
) -> Res<impl Responder> {
    let counts = gate.accountant().get_all_counts(user.user_id).await?;
    Success::ok(EntitlementSnapshot::compute(user.tier, counts))
}

/// Current usage of one metric.
#[get("/usage/{metric}")]
pub async fn get_usage(
    user: web::ReqData<AuthUser>,
    gate: web::Data<Gate>,
    path: web::Path<String>,
) -> Res<impl Responder> {
    let metric = path.into_inner().parse::<Metric>()?;
    let used = gate.accountant().get_current_count(user.user_id, metric).await?;
    let quota = metric.quota_for(user.tier.entitlements());

    Success::ok(UsageResponse {
        metric,
        used,
        quota,
        remaining: quota.remaining(used),
    })
}

/// Dry-run of a gate: reports whether the action would be allowed without
/// consuming anything. Always 200; the decision is the payload.
///
/// # Input
/// - `action`: `create:<metric>`, `template:<class>` or a feature key
#[post("/gate/{action}")]
pub async fn post_gate(
    user: web::ReqData<AuthUser>,
    gate: web::Data<Gate>,
    path: web::Path<String>,
) -> Res<impl Responder> {
    let action = GatedAction::from_key(&path.into_inner())?;
    let decision = gate.evaluate_gate(user.user_id, user.tier, &action).await?;
    Success::ok(decision)
}
