use actix_web::{HttpMessage, HttpRequest, Responder, post};
use common::{
    error::{AppError, Res},
    http::Success,
};

use crate::decision::GateDecision;

fn consumed(req: &HttpRequest) -> Res<GateDecision> {
    req.extensions()
        .get::<GateDecision>()
        .cloned()
        .ok_or_else(|| AppError::Internal("Metered route reached without a gate".to_string()))
}

/// Records the creation of a resume. The route guard has already checked
/// the quota and counted it; the response carries the updated usage.
#[post("")]
pub async fn post_resume(req: HttpRequest) -> Res<impl Responder> {
    Success::created(consumed(&req)?)
}

/// Records a generated cover letter.
#[post("")]
pub async fn post_cover_letter(req: HttpRequest) -> Res<impl Responder> {
    Success::created(consumed(&req)?)
}
