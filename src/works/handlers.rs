use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{
        AutosaveRequest, CreateWorkRequest, ListWorksQuery, PublicWorkDetails, PublicWorkItem,
        UpdateWorkRequest, WorkDetails, WorkListItem,
    },
    repo,
    services::{self, create_work as create_work_service, update_work as update_work_service},
};
use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiResult},
    response::{ApiResponse, Empty, Page, Pagination},
    state::AppState,
};

pub fn works_routes() -> Router<AppState> {
    Router::new()
        .route("/works", get(list_works).post(create_work))
        .route(
            "/works/:id",
            get(get_work).put(update_work).delete(delete_work),
        )
        .route("/works/:id/publish", put(publish_work))
        .route("/works/:id/draft", put(draft_work))
        .route("/works/:id/autosave", put(autosave_work))
}

/// Public feed; no authentication.
pub fn discover_routes() -> Router<AppState> {
    Router::new()
        .route("/discover", get(discover_list))
        .route("/discover/:id", get(discover_work))
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn list_works(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<ListWorksQuery>,
) -> ApiResult<ApiResponse<Page<WorkListItem>>> {
    let p = q.pagination().validate()?;
    let filter = q.filter();

    let works = repo::list_by_user(&state.db, auth.user_id, &filter, p.limit(), p.offset()).await?;
    let total = repo::count_by_user(&state.db, auth.user_id, &filter).await?;

    let list = works.into_iter().map(WorkListItem::from).collect();
    Ok(ApiResponse::ok(p.page_of(list, total)))
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn get_work(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<WorkDetails>> {
    let work = repo::find_owned(&state.db, auth.user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("work not found"))?;
    Ok(ApiResponse::ok(work.into()))
}

#[instrument(skip(state, auth, body), fields(user_id = auth.user_id))]
pub async fn create_work(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateWorkRequest>,
) -> ApiResult<ApiResponse<WorkDetails>> {
    let work = create_work_service(&state, auth.user_id, body).await?;
    info!(work_id = work.id, "work created");
    Ok(ApiResponse::with_message("created", work.into()))
}

#[instrument(skip(state, auth, body), fields(user_id = auth.user_id))]
pub async fn update_work(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateWorkRequest>,
) -> ApiResult<ApiResponse<WorkDetails>> {
    let work = update_work_service(&state, auth.user_id, id, body).await?;
    info!(work_id = work.id, "work updated");
    Ok(ApiResponse::with_message("updated", work.into()))
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn delete_work(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<Empty>> {
    if !repo::delete(&state.db, auth.user_id, id).await? {
        return Err(ApiError::not_found("work not found"));
    }
    info!(work_id = id, "work deleted");
    Ok(ApiResponse::with_message("deleted", Empty {}))
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn publish_work(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<WorkDetails>> {
    let work = services::publish_work(&state, auth.user_id, id).await?;
    info!(work_id = work.id, "work published");
    Ok(ApiResponse::with_message("published", work.into()))
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn draft_work(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<WorkDetails>> {
    let work = services::draft_work(&state, auth.user_id, id).await?;
    info!(work_id = work.id, "work moved to draft");
    Ok(ApiResponse::with_message("saved as draft", work.into()))
}

#[instrument(skip(state, auth, body), fields(user_id = auth.user_id))]
pub async fn autosave_work(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<AutosaveRequest>,
) -> ApiResult<ApiResponse<WorkDetails>> {
    let work = services::autosave_work(&state, auth.user_id, id, body.content).await?;
    Ok(ApiResponse::with_message("saved", work.into()))
}

#[instrument(skip(state))]
pub async fn discover_list(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> ApiResult<ApiResponse<Page<PublicWorkItem>>> {
    let p = p.validate()?;
    let rows = repo::list_public(&state.db, None, p.limit(), p.offset()).await?;
    let total = repo::count_public(&state.db, None).await?;

    let list = rows.into_iter().map(PublicWorkItem::from).collect();
    Ok(ApiResponse::ok(p.page_of(list, total)))
}

#[instrument(skip(state))]
pub async fn discover_work(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<PublicWorkDetails>> {
    let work = repo::find_public(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("work not found or not public"))?;
    Ok(ApiResponse::ok(work.into()))
}
