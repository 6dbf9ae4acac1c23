use actix_web::HttpResponse;
use thiserror::Error;

pub type Res<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    // === CONVERSION ERRORS ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JWT error: {0}")]
    JWT(#[from] jsonwebtoken::errors::Error),

    // === APPLICATION ERRORS ===
    #[error("Authorization error: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A tier identifier outside the catalog reached the evaluator.
    #[error("Unknown subscription tier: '{0}'")]
    UnknownTier(String),

    /// The usage counter store could not be reached or answered with an error.
    #[error("Usage store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// True for failures that may succeed when retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::StorageUnavailable(_))
    }

    pub fn to_http_response(&self) -> HttpResponse {
        let is_dev = cfg!(debug_assertions);

        let to_internal_json = |err_msg: &str| {
            if is_dev {
                serde_json::json!({ "error": err_msg })
            } else {
                serde_json::json!({ "error": "Internal server error" })
            }
        };

        match self {
            // === CONVERSION ERRORS ===
            AppError::Database(error) => {
                log::error!("Database error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(&error.to_string()))
            }
            AppError::Migration(error) => {
                log::error!("Migration error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(&error.to_string()))
            }
            AppError::Redis(error) => {
                log::error!("Redis error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(&error.to_string()))
            }
            AppError::JWT(error) => {
                HttpResponse::Unauthorized().json(serde_json::json!({ "error": error.to_string() }))
            }

            // === APPLICATION ERRORS ===
            AppError::Unauthorized(_) => {
                HttpResponse::Unauthorized().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::BadRequest(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({ "error": self.to_string() }))
            }
            AppError::UnknownTier(tier) => {
                log::error!("Unknown tier '{}' reached the entitlement evaluator", tier);
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": self.to_string(),
                    "reason": "unknown_tier",
                }))
            }
            AppError::StorageUnavailable(error) => {
                log::error!("Usage store unavailable: {}", error);
                HttpResponse::ServiceUnavailable().json(serde_json::json!({
                    "error": "Usage accounting is temporarily unavailable",
                    "reason": "usage_store_unavailable",
                }))
            }

            AppError::Config(error) | AppError::Internal(error) => {
                log::error!("Internal error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(error))
            }
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        self.to_http_response()
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;

    use super::*;

    #[test]
    fn unknown_tier_is_a_bad_request() {
        let res = AppError::UnknownTier("gold".to_string()).to_http_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_unavailable_is_transient_and_503() {
        let err = AppError::StorageUnavailable("connection refused".to_string());
        assert!(err.is_transient());
        assert_eq!(err.to_http_response().status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!AppError::BadRequest("x".to_string()).is_transient());
    }
}
