// Match handlers: result recording and listing.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{required, AppState};
use crate::cache::{ALL_TIME_LEADERBOARD_KEY, ONGOING_TOURNAMENT_KEY, PAST_TOURNAMENTS_KEY};
use crate::db::{MatchDetail, MatchFilter, MatchSelector, MatchStatus, MatchUpdate};
use crate::error::{ApiError, ApiResult};
use crate::stats::MAX_GOALS;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMatchRequest {
    pub match_id: Option<String>,
    pub tournament_id: Option<String>,
    pub player_a_id: Option<String>,
    pub player_b_id: Option<String>,
    pub goals_a: Option<i64>,
    pub goals_b: Option<i64>,
}

#[derive(Deserialize)]
pub struct MatchQuery {
    pub tournament_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

fn selector(req: &UpdateMatchRequest) -> ApiResult<MatchSelector<'_>> {
    if let Some(id) = required(&req.match_id) {
        return Ok(MatchSelector::Id(id));
    }
    match (
        required(&req.tournament_id),
        required(&req.player_a_id),
        required(&req.player_b_id),
    ) {
        (Some(_), Some(a), Some(b)) if a == b => Err(ApiError::bad_request(
            "A player cannot play against themselves",
        )),
        (Some(tournament_id), Some(player_a_id), Some(player_b_id)) => Ok(MatchSelector::Pair {
            tournament_id,
            player_a_id,
            player_b_id,
        }),
        _ => Err(ApiError::bad_request(
            "Provide matchId, or tournamentId with playerAId and playerBId",
        )),
    }
}

fn goals(req: &UpdateMatchRequest) -> ApiResult<(i64, i64)> {
    match (req.goals_a, req.goals_b) {
        (Some(a), Some(b)) if (0..=MAX_GOALS).contains(&a) && (0..=MAX_GOALS).contains(&b) => {
            Ok((a, b))
        }
        _ => Err(ApiError::bad_request(format!(
            "goalsA and goalsB must be integers between 0 and {MAX_GOALS}"
        ))),
    }
}

pub async fn update_match(
    State(state): State<AppState>,
    payload: Result<Json<UpdateMatchRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let (goals_a, goals_b) = goals(&req)?;
    let selector = selector(&req)?;

    match state.db.record_result(selector, goals_a, goals_b).await? {
        MatchUpdate::Recorded(recorded) => {
            state.cache.invalidate_multiple(&[
                ONGOING_TOURNAMENT_KEY,
                PAST_TOURNAMENTS_KEY,
                ALL_TIME_LEADERBOARD_KEY,
            ]);
            tracing::info!(
                "Recorded {goals_a}-{goals_b} for match {}",
                recorded.match_id
            );
            let message = if recorded.tournament_finished {
                "Match updated successfully, tournament finished"
            } else {
                "Match updated successfully"
            };
            Ok(Json(json!({ "success": true, "message": message })))
        }
        MatchUpdate::NotFound => Err(ApiError::not_found("No match found")),
        MatchUpdate::AlreadyPlayed => Err(ApiError::conflict(match selector {
            MatchSelector::Id(_) => "Match has already been played",
            MatchSelector::Pair { .. } => "All matches between these players have been played",
        })),
        MatchUpdate::TournamentClosed(status) => Err(ApiError::conflict(format!(
            "Tournament is {status}"
        ))),
    }
}

pub async fn get_matches(
    State(state): State<AppState>,
    query: Result<Query<MatchQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<MatchDetail>>> {
    let Query(params) = query?;
    if let Some(ref status) = params.status {
        status.parse::<MatchStatus>().map_err(ApiError::BadRequest)?;
    }

    let filter = MatchFilter {
        tournament_id: params.tournament_id,
        status: params.status,
        limit: params.limit,
    };
    Ok(Json(state.db.list_matches(&filter).await?))
}
