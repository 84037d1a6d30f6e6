// Leaderboard handler.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::{required, AppState};
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
pub struct StatsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub tournament_id: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_stats(
    State(state): State<AppState>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(params) = query?;

    match params.kind.as_deref() {
        Some("tournament") => {
            let tournament_id = required(&params.tournament_id)
                .ok_or_else(|| ApiError::bad_request("tournament_id is required"))?;
            let rows = state
                .db
                .tournament_leaderboard(tournament_id, params.limit)
                .await?;
            Ok(Json(rows).into_response())
        }
        Some("all-time") => {
            let rows = state.db.all_time_leaderboard(params.limit).await?;
            Ok(Json(rows).into_response())
        }
        _ => Err(ApiError::bad_request("Invalid type parameter")),
    }
}
