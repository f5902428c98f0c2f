use anyhow::Context;
use sqlx::{Sqlite, SqlitePool, Transaction};
use time::OffsetDateTime;

use super::repo_types::{ConsumptionRecord, KindRow, NewConsumption, TotalsRow};
use crate::db::now_utc;

/// Insert a consumption record within a transaction.
pub async fn insert_tx(
    tx: &mut Transaction<'_, Sqlite>,
    rec: &NewConsumption<'_>,
) -> anyhow::Result<ConsumptionRecord> {
    let row = sqlx::query_as::<_, ConsumptionRecord>(
        r#"
        INSERT INTO consumption_records (user_id, work_id, kind, amount, description, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, user_id, work_id, kind, amount, description, created_at
        "#,
    )
    .bind(rec.user_id)
    .bind(rec.work_id)
    .bind(rec.kind)
    .bind(rec.amount)
    .bind(rec.description)
    .bind(now_utc())
    .fetch_one(&mut **tx)
    .await
    .context("insert consumption record")?;
    Ok(row)
}

// ---- Queries ----

/// Newest first; `kind = None` returns every kind.
pub async fn list_by_user(
    db: &SqlitePool,
    user_id: i64,
    kind: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<ConsumptionRecord>> {
    let rows = sqlx::query_as::<_, ConsumptionRecord>(
        r#"
        SELECT id, user_id, work_id, kind, amount, description, created_at
          FROM consumption_records
         WHERE user_id = ?
           AND (? IS NULL OR kind = ?)
         ORDER BY created_at DESC, id DESC
         LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id)
    .bind(kind)
    .bind(kind)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
    .context("list consumption records")?;
    Ok(rows)
}

pub async fn count_by_user(
    db: &SqlitePool,
    user_id: i64,
    kind: Option<&str>,
) -> anyhow::Result<i64> {
    let (n,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
          FROM consumption_records
         WHERE user_id = ?
           AND (? IS NULL OR kind = ?)
        "#,
    )
    .bind(user_id)
    .bind(kind)
    .bind(kind)
    .fetch_one(db)
    .await
    .context("count consumption records")?;
    Ok(n)
}

/// Aggregates over records created at or after `since` (all records when `None`).
pub async fn totals(
    db: &SqlitePool,
    user_id: i64,
    since: Option<OffsetDateTime>,
) -> anyhow::Result<TotalsRow> {
    let row = sqlx::query_as::<_, TotalsRow>(
        r#"
        SELECT COUNT(*)                  AS total_count,
               COALESCE(SUM(amount), 0)  AS total_amount,
               MIN(created_at)           AS first_at,
               MAX(created_at)           AS last_at
          FROM consumption_records
         WHERE user_id = ?
           AND (? IS NULL OR created_at >= ?)
        "#,
    )
    .bind(user_id)
    .bind(since)
    .bind(since)
    .fetch_one(db)
    .await
    .context("consumption totals")?;
    Ok(row)
}

pub async fn totals_by_kind(
    db: &SqlitePool,
    user_id: i64,
    since: Option<OffsetDateTime>,
) -> anyhow::Result<Vec<KindRow>> {
    let rows = sqlx::query_as::<_, KindRow>(
        r#"
        SELECT kind,
               COUNT(*)                 AS count,
               COALESCE(SUM(amount), 0) AS amount
          FROM consumption_records
         WHERE user_id = ?
           AND (? IS NULL OR created_at >= ?)
         GROUP BY kind
         ORDER BY amount DESC, kind ASC
        "#,
    )
    .bind(user_id)
    .bind(since)
    .bind(since)
    .fetch_all(db)
    .await
    .context("consumption totals by kind")?;
    Ok(rows)
}
