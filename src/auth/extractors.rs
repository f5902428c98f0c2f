use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::{error, warn};

use super::{
    claims::{Claims, TokenKind},
    jwt::JwtKeys,
    repo,
};
use crate::{error::ApiError, state::AppState};

/// Authenticated caller: a valid, unrevoked access token.
pub struct AuthUser {
    pub user_id: i64,
    pub claims: Claims,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("invalid auth scheme"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            ApiError::unauthorized("invalid or expired token")
        })?;

        if claims.kind != TokenKind::Access {
            return Err(ApiError::unauthorized("access token required"));
        }

        let user_id = claims
            .user_id()
            .ok_or_else(|| ApiError::unauthorized("invalid token subject"))?;

        let revoked = repo::is_token_revoked(&state.db, claims.jti)
            .await
            .map_err(|e| {
                error!(error = %e, "revocation lookup failed");
                ApiError::Internal(e.to_string())
            })?;
        if revoked {
            warn!(user_id, jti = %claims.jti, "revoked token presented");
            return Err(ApiError::unauthorized("token has been revoked"));
        }

        Ok(AuthUser { user_id, claims })
    }
}
