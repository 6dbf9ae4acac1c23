use actix_web::web;

pub mod routes {
    pub mod tier;
}

pub mod services {
    pub mod catalog;
    pub mod evaluator;
}

pub mod models {
    pub mod feature;
    pub mod metric;
    pub mod snapshot;
    pub mod tier;
}

pub use models::{
    feature::Feature,
    metric::Metric,
    snapshot::{EntitlementSnapshot, MetricUsage},
    tier::{EntitlementRecord, LegacyTier, Quota, SubscriptionTier, SupportClass, TemplateAccess},
};

pub fn mount_tiers() -> actix_web::Scope {
    web::scope("/tiers")
        .service(routes::tier::get_tiers)
        .service(routes::tier::get_tier)
}
