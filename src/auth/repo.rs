use anyhow::Context;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{ProfileChanges, User};
use crate::db::now_utc;

const USER_COLUMNS: &str = "id, username, password_hash, email, avatar, nickname, phone, bio, \
                            location, website, created_at, updated_at";

impl User {
    pub async fn find_by_username(db: &SqlitePool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(db)
        .await
        .context("find user by username")?;
        Ok(user)
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// Inserts a new user; `None` means the username is already taken.
    pub async fn create(
        db: &SqlitePool,
        username: &str,
        password_hash: &str,
        email: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let now = now_utc();
        let res = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, password_hash, email, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(password_hash)
        .bind(email)
        .bind(now)
        .bind(now)
        .fetch_one(db)
        .await;

        match res {
            Ok(user) => Ok(Some(user)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
            Err(e) => Err(e).context("insert user"),
        }
    }

    pub async fn update_profile(
        db: &SqlitePool,
        id: i64,
        changes: &ProfileChanges,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET email      = CASE WHEN ? IS NULL THEN email ELSE NULLIF(?, '') END,
                   avatar     = COALESCE(?, avatar),
                   nickname   = COALESCE(?, nickname),
                   phone      = COALESCE(?, phone),
                   bio        = COALESCE(?, bio),
                   location   = COALESCE(?, location),
                   website    = COALESCE(?, website),
                   updated_at = ?
             WHERE id = ?
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(changes.email.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.avatar.as_deref())
        .bind(changes.nickname.as_deref())
        .bind(changes.phone.as_deref())
        .bind(changes.bio.as_deref())
        .bind(changes.location.as_deref())
        .bind(changes.website.as_deref())
        .bind(now_utc())
        .bind(id)
        .fetch_optional(db)
        .await
        .context("update user profile")?;
        Ok(user)
    }
}

// ---- Revoked tokens ----

/// Marks a token id as revoked until its natural expiry.
///
/// Returns `false` when the token was already revoked.
pub async fn revoke_token(
    db: &SqlitePool,
    jti: Uuid,
    user_id: i64,
    expires_at: i64,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        INSERT INTO revoked_tokens (jti, user_id, expires_at, revoked_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (jti) DO NOTHING
        "#,
    )
    .bind(jti.to_string())
    .bind(user_id)
    .bind(expires_at)
    .bind(now_utc())
    .execute(db)
    .await
    .context("revoke token")?;
    Ok(res.rows_affected() == 1)
}

pub async fn is_token_revoked(db: &SqlitePool, jti: Uuid) -> anyhow::Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM revoked_tokens WHERE jti = ?")
        .bind(jti.to_string())
        .fetch_optional(db)
        .await
        .context("check revoked token")?;
    Ok(row.is_some())
}

/// Drops revocations whose tokens have expired anyway.
pub async fn prune_revoked_tokens(db: &SqlitePool) -> anyhow::Result<u64> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let res = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
        .bind(now)
        .execute(db)
        .await
        .context("prune revoked tokens")?;
    Ok(res.rows_affected())
}
