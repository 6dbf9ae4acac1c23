use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    web,
};
use common::error::AppError;

use crate::{decision::GatedAction, middleware::auth::AuthUser, service::Gate};

// --- Route Guard Definition ---

/// Enforces one gated action in front of a scope. Needs [`AuthUser`] from
/// the auth middleware and a `web::Data<Gate>` in app data.
pub struct GateGuard {
    action: Rc<GatedAction>,
}

impl GateGuard {
    pub fn new(action: GatedAction) -> Self {
        GateGuard {
            action: Rc::new(action),
        }
    }
}

// --- Middleware Transform Implementation ---

impl<S, B> Transform<S, ServiceRequest> for GateGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = GateGuardMiddleware<S>;
    type InitError = ();
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(GateGuardMiddleware {
            service: Rc::new(service),
            action: Rc::clone(&self.action),
        }))
    }
}

// --- Actual Middleware Service ---

pub struct GateGuardMiddleware<S> {
    service: Rc<S>,
    action: Rc<GatedAction>,
}

impl<S, B> Service<ServiceRequest> for GateGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = Rc::clone(&self.service);
        let action = Rc::clone(&self.action);

        Box::pin(async move {
            // 1. Caller identity
            let user = req.extensions().get::<AuthUser>().copied();
            let user = match user {
                Some(user) => user,
                None => {
                    return Ok(req.error_response(AppError::Unauthorized(
                        "No authorization token provided".to_string(),
                    )));
                }
            };

            // 2. Gate service
            let gate = match req.app_data::<web::Data<Gate>>().cloned() {
                Some(gate) => gate,
                None => {
                    return Ok(req.error_response(AppError::Internal(
                        "Gate service is not configured".to_string(),
                    )));
                }
            };

            // 3. Check and consume
            let decision = match gate.enforce_gate(user.user_id, user.tier, &action).await {
                Ok(decision) => decision,
                Err(e) => return Ok(req.error_response(e)),
            };

            if !decision.allowed {
                log::info!(
                    "Gate denied {} for user {} on tier {}: {:?}",
                    action,
                    user.user_id,
                    user.tier,
                    decision.reason
                );
                let response = decision.to_http_response();
                return Ok(req.into_response(response));
            }

            log::debug!("Gate allowed {} for user {}", action, user.user_id);
            req.extensions_mut().insert(decision);
            srv.call(req).await.map(|res| res.map_into_boxed_body())
        })
    }
}
