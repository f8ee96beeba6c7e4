//! JWT middleware.
//!
//! Extracts `Authorization: Bearer <token>`, validates the signature, calls
//! `Principal::from_jwt_claims()`, and injects `Principal` into request
//! extensions. Returns 401 if the token is missing or invalid.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde_json::json;

use inspection_core::principal::{JwtClaims, Principal};

/// Shared state for JWT validation.
#[derive(Clone)]
pub struct JwtConfig {
    pub decoding_key: DecodingKey,
    pub validation: Validation,
}

impl JwtConfig {
    /// Create from a symmetric secret (HS256).
    /// Tokens from the identity provider carry no `exp`; lifetime is
    /// bounded by the provider's own revocation, not the claim.
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

fn unauthorized(message: String) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "UNAUTHENTICATED", "message": message})),
    )
        .into_response()
}

/// Axum middleware layer that validates the JWT and injects `Principal`.
pub async fn jwt_auth(mut req: Request, next: Next) -> Result<Response, Response> {
    let jwt_config = req
        .extensions()
        .get::<JwtConfig>()
        .cloned()
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "INTERNAL", "message": "JWT config not initialized"})),
            )
                .into_response()
        })?;

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized("missing Authorization header".into()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("expected 'Bearer <token>'".into()))?;

    let token_data = decode::<JwtClaims>(token, &jwt_config.decoding_key, &jwt_config.validation)
        .map_err(|e| {
            tracing::warn!("JWT validation failed: {e}");
            unauthorized(format!("invalid token: {e}"))
        })?;

    let principal = Principal::from_jwt_claims(&token_data.claims)
        .map_err(|e| unauthorized(format!("invalid claims: {e}")))?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
