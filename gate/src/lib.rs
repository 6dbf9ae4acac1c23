use actix_web::web;
use api_tiers::Metric;

pub mod decision;
pub mod service;

pub mod middleware {
    pub mod auth;
    pub mod guard;
}

pub mod routes {
    pub mod actions;
    pub mod dashboard;
}

pub use decision::{DenialReason, GateDecision, GatedAction};
pub use middleware::auth::AuthUser;
pub use service::Gate;

use middleware::{auth::AuthMiddleware, guard::GateGuard};

/// Requires valid claims with a known tier on every request in scope.
pub fn auth_middleware() -> AuthMiddleware {
    AuthMiddleware::new()
}

/// Route guard that enforces `action` before the wrapped handlers run.
pub fn middleware(action: GatedAction) -> GateGuard {
    GateGuard::new(action)
}

pub fn mount_dashboard() -> actix_web::Scope {
    web::scope("")
        .service(routes::dashboard::get_entitlements)
        .service(routes::dashboard::get_usage)
        .service(routes::dashboard::post_gate)
}

pub fn mount_actions() -> actix_web::Scope {
    web::scope("")
        .service(
            web::scope("/resumes")
                .wrap(middleware(GatedAction::Create(Metric::Resumes)))
                .service(routes::actions::post_resume),
        )
        .service(
            web::scope("/cover-letters")
                .wrap(middleware(GatedAction::Create(Metric::CoverLetters)))
                .service(routes::actions::post_cover_letter),
        )
}
