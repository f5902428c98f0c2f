//! Public, unauthenticated view of other users.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use serde::Serialize;
use tracing::instrument;

use crate::{
    auth::repo_types::User,
    error::{ApiError, ApiResult},
    response::{ApiResponse, Page, Pagination},
    state::AppState,
    works::{dto::PublicWorkItem, repo as works_repo},
};

#[derive(Debug, Serialize)]
pub struct PublicProfile {
    pub id: String,
    pub username: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub public_works_count: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/:id", get(get_public_profile))
        .route("/users/:id/works", get(list_public_works))
}

#[instrument(skip(state))]
pub async fn get_public_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<PublicProfile>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    let public_works_count = works_repo::count_public(&state.db, Some(user.id)).await?;

    Ok(ApiResponse::ok(PublicProfile {
        id: user.id.to_string(),
        username: user.username,
        nickname: user.nickname,
        avatar: user.avatar,
        bio: user.bio,
        public_works_count,
    }))
}

/// One user's published works, newest publication first.
#[instrument(skip(state))]
pub async fn list_public_works(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(p): Query<Pagination>,
) -> ApiResult<ApiResponse<Page<PublicWorkItem>>> {
    let p = p.validate()?;
    if User::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::not_found("user not found"));
    }

    let rows = works_repo::list_public(&state.db, Some(id), p.limit(), p.offset()).await?;
    let total = works_repo::count_public(&state.db, Some(id)).await?;

    let list = rows.into_iter().map(PublicWorkItem::from).collect();
    Ok(ApiResponse::ok(p.page_of(list, total)))
}
