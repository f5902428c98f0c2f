use axum::{
    extract::{Query, State},
    routing::get,
    Router,
};
use time::Duration;
use tracing::instrument;

use super::{
    dto::{ConsumptionStats, HistoryItem, HistoryQuery, StatsQuery},
    repo,
};
use crate::{
    auth::extractors::AuthUser,
    db::now_utc,
    error::{ApiError, ApiResult},
    response::{ApiResponse, Page},
    state::AppState,
};

pub const MAX_STATS_DAYS: i64 = 3650;

pub fn consumption_routes() -> Router<AppState> {
    Router::new()
        .route("/consumption/history", get(history))
        .route("/consumption/stats", get(stats))
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<HistoryQuery>,
) -> ApiResult<ApiResponse<Page<HistoryItem>>> {
    let p = q.pagination().validate()?;
    let kind = q.kind();

    let rows = repo::list_by_user(&state.db, auth.user_id, kind, p.limit(), p.offset()).await?;
    let total = repo::count_by_user(&state.db, auth.user_id, kind).await?;

    let list = rows.into_iter().map(HistoryItem::from).collect();
    Ok(ApiResponse::ok(p.page_of(list, total)))
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<StatsQuery>,
) -> ApiResult<ApiResponse<ConsumptionStats>> {
    let since = match q.days {
        None => None,
        Some(d) if (1..=MAX_STATS_DAYS).contains(&d) => Some(now_utc() - Duration::days(d)),
        Some(_) => {
            return Err(ApiError::bad_request(format!(
                "days must be between 1 and {MAX_STATS_DAYS}"
            )))
        }
    };

    let totals = repo::totals(&state.db, auth.user_id, since).await?;
    let by_kind = repo::totals_by_kind(&state.db, auth.user_id, since).await?;

    Ok(ApiResponse::ok(ConsumptionStats {
        total_count: totals.total_count,
        total_amount: totals.total_amount,
        first_at: totals.first_at,
        last_at: totals.last_at,
        by_kind: by_kind.into_iter().map(Into::into).collect(),
    }))
}
