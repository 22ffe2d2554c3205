use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use crate::auth::token::validate_session_token;
use crate::error::AppError;

use super::app_state::AppState;

/// Name of the cookie carrying the session JWT.
pub const SESSION_COOKIE: &str = "classhall_session";

/// Extractor that validates the session JWT from the `classhall_session`
/// cookie or an `Authorization: Bearer` header.
/// Use this in any handler that requires authentication.
pub struct AuthUser {
    pub user_id: String,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .or_else(|| bearer_token(parts))
            .ok_or(AppError::Unauthorized("Not authenticated"))?;

        let claims = validate_session_token(&token, &state.auth_config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("Invalid or expired session"))?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}
