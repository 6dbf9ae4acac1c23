use actix_web::{Responder, get, web};
use common::{error::Res, http::Success};
use serde::Serialize;

use crate::{models::tier::EntitlementRecord, services::catalog};

#[derive(Debug, Serialize)]
pub struct TiersResponse {
    pub tiers: &'static [EntitlementRecord],
}

/// Lists every tier with its entitlements, lowest tier first.
///
/// # Output
/// - Success: `{ "tiers": [ { "tier": "free", "quota": 1, "templateAccess": "basic", ... }, ... ] }`
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/tiers');
/// const { tiers } = await response.json();
/// // tiers[2] => { tier: "professional", quota: "unlimited", templateAccess: "premium", ... }
/// ```
#[get("")]
pub async fn get_tiers() -> Res<impl Responder> {
    Success::ok(TiersResponse {
        tiers: catalog::all(),
    })
}

/// Returns the entitlements of a single tier.
///
/// # Output
/// - Success: the entitlement record
/// - Error: 400 with `reason: "unknown_tier"` for ids outside the catalog
#[get("/{tier}")]
pub async fn get_tier(path: web::Path<String>) -> Res<impl Responder> {
    let record = catalog::lookup(&path.into_inner())?;
    Success::ok(record)
}
