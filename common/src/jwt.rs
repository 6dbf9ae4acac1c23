use actix_web::{HttpMessage, HttpResponse, dev::ServiceRequest};
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Res};

/// Identity issued by the auth provider.
///
/// `tier` is kept as the raw identifier from the token; it is validated
/// against the tier catalog where it is used, so an unknown value fails
/// the request instead of being guessed at here.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub user_id: Uuid,
    pub tier: String,
    pub exp: usize,
}

/// Extracts claims object from JWT token.
/// Requires JWT secret.
pub fn validate_jwt(token: &str, secret: &str) -> Res<JwtClaims> {
    let token_data = jsonwebtoken::decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

pub fn get_jwt_claims_or_error(req: &ServiceRequest) -> Result<JwtClaims, HttpResponse> {
    if let Some(jwt_claims_res) = req.extensions().get::<Res<JwtClaims>>() {
        match jwt_claims_res {
            Ok(claims) => Ok(claims.clone()),
            Err(app_error) => Err(app_error.to_http_response()),
        }
    } else {
        Err(
            AppError::Unauthorized("No authorization token provided".to_string())
                .to_http_response(),
        )
    }
}

/// Issues tokens the way the auth provider does, for exercising the
/// middleware stack in tests.
#[cfg(any(test, feature = "test-util"))]
pub mod issue {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header};
    use uuid::Uuid;

    use super::JwtClaims;
    use crate::{
        env_config::JwtConfig,
        error::{AppError, Res},
    };

    pub struct ClaimsSpec {
        pub user_id: Uuid,
        pub tier: String,
    }

    /// Signs a one-hour token for `spec` with the configured secret.
    pub fn generate_jwt(spec: ClaimsSpec, config: &JwtConfig) -> Res<String> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::hours(1))
            .ok_or_else(|| AppError::Internal("JWT expiration overflowed".to_string()))?
            .timestamp();

        let claims = JwtClaims {
            user_id: spec.user_id,
            tier: spec.tier,
            exp: expiration as usize,
        };

        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        issue::{ClaimsSpec, generate_jwt},
        *,
    };
    use crate::env_config::JwtConfig;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
        }
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let user_id = Uuid::new_v4();
        let token = generate_jwt(
            ClaimsSpec {
                user_id,
                tier: "basic".to_string(),
            },
            &config(),
        )
        .unwrap();

        let claims = validate_jwt(&token, "test-secret").unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.tier, "basic");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_jwt(
            ClaimsSpec {
                user_id: Uuid::new_v4(),
                tier: "free".to_string(),
            },
            &config(),
        )
        .unwrap();

        assert!(matches!(validate_jwt(&token, "other"), Err(AppError::JWT(_))));
    }
}
