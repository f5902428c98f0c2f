use anyhow::Context;
use sqlx::{types::Json, Sqlite, SqlitePool, Transaction};

use super::repo_types::{PublicWork, Work, WorkFields, WorkFilter, WorkStatus};
use crate::db::now_utc;

const WORK_COLUMNS: &str =
    "id, user_id, title, content, cover, status, published_at, created_at, updated_at";

const PUBLIC_WORK_SELECT: &str = r#"
    SELECT w.id, w.user_id, w.title, w.content, w.cover, w.status, w.published_at,
           w.created_at, w.updated_at,
           u.username AS author_username, u.nickname AS author_nickname, u.avatar AS author_avatar
      FROM works w
      JOIN users u ON u.id = w.user_id
     WHERE w.status = 'public' AND w.published_at IS NOT NULL
"#;

/// Insert a new work within a transaction.
pub async fn insert_tx(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    fields: &WorkFields,
) -> anyhow::Result<Work> {
    let now = now_utc();
    let work = sqlx::query_as::<_, Work>(&format!(
        r#"
        INSERT INTO works (user_id, title, content, cover, status, published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {WORK_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(&fields.title)
    .bind(Json(&fields.content))
    .bind(fields.cover.as_deref())
    .bind(fields.status.as_str())
    .bind(fields.published_at)
    .bind(now)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
    .context("insert work")?;
    Ok(work)
}

/// Returns the work only when it belongs to `user_id`.
pub async fn find_owned(db: &SqlitePool, user_id: i64, id: i64) -> anyhow::Result<Option<Work>> {
    let work = sqlx::query_as::<_, Work>(&format!(
        "SELECT {WORK_COLUMNS} FROM works WHERE id = ? AND user_id = ?"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("get work")?;
    Ok(work)
}

fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub async fn list_by_user(
    db: &SqlitePool,
    user_id: i64,
    filter: &WorkFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Work>> {
    let status = filter.status.map(WorkStatus::as_str);
    let pattern = filter.search.as_deref().map(like_pattern);
    let rows = sqlx::query_as::<_, Work>(&format!(
        r#"
        SELECT {WORK_COLUMNS}
          FROM works
         WHERE user_id = ?
           AND (? IS NULL OR status = ?)
           AND (? IS NULL OR title LIKE ? ESCAPE '\')
         ORDER BY updated_at DESC, id DESC
         LIMIT ? OFFSET ?
        "#
    ))
    .bind(user_id)
    .bind(status)
    .bind(status)
    .bind(pattern.as_deref())
    .bind(pattern.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list works")?;
    Ok(rows)
}

pub async fn count_by_user(
    db: &SqlitePool,
    user_id: i64,
    filter: &WorkFilter,
) -> anyhow::Result<i64> {
    let status = filter.status.map(WorkStatus::as_str);
    let pattern = filter.search.as_deref().map(like_pattern);
    let (n,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
          FROM works
         WHERE user_id = ?
           AND (? IS NULL OR status = ?)
           AND (? IS NULL OR title LIKE ? ESCAPE '\')
        "#,
    )
    .bind(user_id)
    .bind(status)
    .bind(status)
    .bind(pattern.as_deref())
    .bind(pattern.as_deref())
    .fetch_one(db)
    .await
    .context("count works")?;
    Ok(n)
}

/// Published works, newest publication first; `author = None` spans every user.
pub async fn list_public(
    db: &SqlitePool,
    author: Option<i64>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<PublicWork>> {
    let rows = sqlx::query_as::<_, PublicWork>(&format!(
        r#"
        {PUBLIC_WORK_SELECT}
           AND (? IS NULL OR w.user_id = ?)
         ORDER BY w.published_at DESC, w.id DESC
         LIMIT ? OFFSET ?
        "#
    ))
    .bind(author)
    .bind(author)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list public works")?;
    Ok(rows)
}

pub async fn count_public(db: &SqlitePool, author: Option<i64>) -> anyhow::Result<i64> {
    let (n,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
          FROM works
         WHERE status = 'public' AND published_at IS NOT NULL
           AND (? IS NULL OR user_id = ?)
        "#,
    )
    .bind(author)
    .bind(author)
    .fetch_one(db)
    .await
    .context("count public works")?;
    Ok(n)
}

/// A single work, only if it is public.
pub async fn find_public(db: &SqlitePool, id: i64) -> anyhow::Result<Option<PublicWork>> {
    let row = sqlx::query_as::<_, PublicWork>(&format!("{PUBLIC_WORK_SELECT} AND w.id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("get public work")?;
    Ok(row)
}

pub async fn update(
    db: &SqlitePool,
    user_id: i64,
    id: i64,
    fields: &WorkFields,
) -> anyhow::Result<Option<Work>> {
    let work = sqlx::query_as::<_, Work>(&format!(
        r#"
        UPDATE works
           SET title = ?, content = ?, cover = ?, status = ?, published_at = ?, updated_at = ?
         WHERE id = ? AND user_id = ?
        RETURNING {WORK_COLUMNS}
        "#
    ))
    .bind(&fields.title)
    .bind(Json(&fields.content))
    .bind(fields.cover.as_deref())
    .bind(fields.status.as_str())
    .bind(fields.published_at)
    .bind(now_utc())
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("update work")?;
    Ok(work)
}

/// `false` when nothing matched (missing or foreign work).
pub async fn delete(db: &SqlitePool, user_id: i64, id: i64) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM works WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete work")?;
    Ok(res.rows_affected() > 0)
}
