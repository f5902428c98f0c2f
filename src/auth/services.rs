use lazy_static::lazy_static;
use regex::Regex;
use sqlx::SqlitePool;
use tracing::debug;

use crate::auth::{claims::Claims, jwt::JwtKeys, repo};
use crate::error::{ApiError, ApiResult};

pub const MIN_PASSWORD_LEN: usize = 6;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.\-]{3,32}$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

/// Trims an optional email; blank becomes `None`, anything else must be valid.
pub(crate) fn normalize_email(email: Option<String>) -> ApiResult<Option<String>> {
    match email.map(|e| e.trim().to_lowercase()) {
        None => Ok(None),
        Some(e) if e.is_empty() => Ok(None),
        Some(e) if is_valid_email(&e) => Ok(Some(e)),
        Some(_) => Err(ApiError::bad_request("invalid email")),
    }
}

/// Email for a profile update: `None` keeps the stored one, blank clears it.
pub(crate) fn email_change(email: Option<String>) -> ApiResult<Option<String>> {
    match email {
        Some(e) if e.trim().is_empty() => Ok(Some(String::new())),
        other => normalize_email(other),
    }
}

pub(crate) fn validate_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub fn issue_tokens(keys: &JwtKeys, user_id: i64) -> anyhow::Result<TokenPair> {
    Ok(TokenPair {
        access_token: keys.sign_access(user_id)?,
        refresh_token: keys.sign_refresh(user_id)?,
    })
}

/// Revokes the token described by `claims` and prunes stale revocations.
///
/// `false` means another request revoked the same token first.
pub async fn revoke(db: &SqlitePool, claims: &Claims, user_id: i64) -> anyhow::Result<bool> {
    let revoked = repo::revoke_token(db, claims.jti, user_id, claims.exp as i64).await?;
    let pruned = repo::prune_revoked_tokens(db).await?;
    if pruned > 0 {
        debug!(pruned, "pruned expired revocations");
    }
    Ok(revoked)
}
