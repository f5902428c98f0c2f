use anyhow::Context;
use time::OffsetDateTime;
use tracing::debug;

use super::{
    dto::{CreateWorkRequest, UpdateWorkRequest},
    repo,
    repo_types::{Work, WorkFields, WorkStatus},
};
use crate::{
    consumption::{
        repo as consumption_repo,
        repo_types::{NewConsumption, KIND_WORK_CREATE},
    },
    db::now_utc,
    error::{ApiError, ApiResult},
    state::AppState,
};

pub const MAX_TITLE_LEN: usize = 100;

pub(crate) fn normalize_title(title: &str) -> ApiResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

pub(crate) fn parse_status(raw: &str) -> ApiResult<WorkStatus> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request("status must be one of private, public, draft"))
}

/// Blank cover clears it.
fn normalize_cover(cover: String) -> Option<String> {
    let cover = cover.trim();
    (!cover.is_empty()).then(|| cover.to_string())
}

/// `published_at` after moving to `next`: kept while public, set on publish, cleared otherwise.
pub(crate) fn published_at_for(
    next: WorkStatus,
    current: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> Option<OffsetDateTime> {
    match next {
        WorkStatus::Public => Some(current.unwrap_or(now)),
        WorkStatus::Private | WorkStatus::Draft => None,
    }
}

/// Creates the work and its consumption record in one transaction.
pub async fn create_work(
    st: &AppState,
    user_id: i64,
    req: CreateWorkRequest,
) -> ApiResult<Work> {
    let status = match req.status.as_deref() {
        Some(s) => parse_status(s)?,
        None => WorkStatus::default(),
    };
    let fields = WorkFields {
        title: normalize_title(&req.title)?,
        content: req.content.unwrap_or_else(|| serde_json::json!({})),
        cover: req.cover.and_then(normalize_cover),
        status,
        published_at: published_at_for(status, None, now_utc()),
    };

    let mut tx = st.db.begin().await.context("begin tx")?;
    let work = repo::insert_tx(&mut tx, user_id, &fields).await?;
    let record = consumption_repo::insert_tx(
        &mut tx,
        &NewConsumption {
            user_id,
            work_id: Some(work.id),
            kind: KIND_WORK_CREATE,
            amount: st.config.work_create_cost,
            description: Some(work.title.as_str()),
        },
    )
    .await?;
    tx.commit().await.context("commit tx")?;

    debug!(work_id = work.id, record_id = record.id, "work created");
    Ok(work)
}

async fn load_owned(st: &AppState, user_id: i64, id: i64) -> ApiResult<Work> {
    repo::find_owned(&st.db, user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("work not found"))
}

async fn save(st: &AppState, user_id: i64, id: i64, fields: &WorkFields) -> ApiResult<Work> {
    repo::update(&st.db, user_id, id, fields)
        .await?
        .ok_or_else(|| ApiError::not_found("work not found"))
}

/// Applies the provided fields on top of the stored work.
pub async fn update_work(
    st: &AppState,
    user_id: i64,
    id: i64,
    req: UpdateWorkRequest,
) -> ApiResult<Work> {
    let current = load_owned(st, user_id, id).await?.into_fields();

    let status = match req.status.as_deref() {
        Some(s) => parse_status(s)?,
        None => current.status,
    };
    let title = match req.title.as_deref() {
        Some(t) => normalize_title(t)?,
        None => current.title,
    };
    let fields = WorkFields {
        title,
        content: req.content.unwrap_or(current.content),
        cover: match req.cover {
            Some(c) => normalize_cover(c),
            None => current.cover,
        },
        status,
        published_at: published_at_for(status, current.published_at, now_utc()),
    };

    save(st, user_id, id, &fields).await
}

/// Makes the work public with a fresh publication time, even if it was public already.
pub async fn publish_work(st: &AppState, user_id: i64, id: i64) -> ApiResult<Work> {
    let fields = WorkFields {
        status: WorkStatus::Public,
        published_at: Some(now_utc()),
        ..load_owned(st, user_id, id).await?.into_fields()
    };
    save(st, user_id, id, &fields).await
}

/// Takes the work back to draft and forgets its publication time.
pub async fn draft_work(st: &AppState, user_id: i64, id: i64) -> ApiResult<Work> {
    let fields = WorkFields {
        status: WorkStatus::Draft,
        published_at: None,
        ..load_owned(st, user_id, id).await?.into_fields()
    };
    save(st, user_id, id, &fields).await
}

/// Replaces only the collage content; status and publication stay as they are.
pub async fn autosave_work(
    st: &AppState,
    user_id: i64,
    id: i64,
    content: serde_json::Value,
) -> ApiResult<Work> {
    let fields = WorkFields {
        content,
        ..load_owned(st, user_id, id).await?.into_fields()
    };
    save(st, user_id, id, &fields).await
}
