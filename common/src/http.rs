use actix_web::{HttpResponse, Responder, http::StatusCode};
use serde::Serialize;

use super::error::Res;

/// JSON success responses for route handlers.
pub struct Success;

impl Success {
    pub fn ok<T: Serialize>(body: T) -> Res<impl Responder> {
        Self::with_status(StatusCode::OK, body)
    }

    pub fn created<T: Serialize>(body: T) -> Res<impl Responder> {
        Self::with_status(StatusCode::CREATED, body)
    }

    pub fn with_status<T: Serialize>(status: StatusCode, body: T) -> Res<impl Responder> {
        Ok(HttpResponse::build(status).json(body))
    }
}
