// Tournament handlers: creation, deletion, ending and listing.

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
use crate::db::{
    generate_id, EndLeague, RosterPlayer, TournamentFilter, TournamentStatus, TournamentSummary,
};
use crate::error::{ApiError, ApiResult};
use crate::fixtures::{matches_per_player_options, max_matches_per_player, total_pairs};

pub const MIN_PLAYERS: usize = 3;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlayer {
    pub id: Option<String>,
    pub name: Option<String>,
    pub team_name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTournamentRequest {
    pub player_ids: Option<Vec<String>>,
    pub players: Option<Vec<NewPlayer>>,
    pub matches_per_player: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentIdRequest {
    pub tournament_id: Option<String>,
}

#[derive(Deserialize)]
pub struct TournamentQuery {
    pub id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct FixtureOptionsQuery {
    pub players: Option<usize>,
}

/// Build the inline roster, generating ids for players that lack one.
fn inline_roster(players: &[NewPlayer]) -> ApiResult<Vec<RosterPlayer>> {
    players
        .iter()
        .map(|p| match (required(&p.name), required(&p.team_name)) {
            (Some(name), Some(team_name)) => Ok(RosterPlayer {
                id: required(&p.id)
                    .map(str::to_string)
                    .unwrap_or_else(|| generate_id("player")),
                name: name.to_string(),
                team_name: team_name.to_string(),
                photo_url: required(&p.photo_url).map(str::to_string),
            }),
            _ => Err(ApiError::bad_request(
                "Each player needs a name and team name",
            )),
        })
        .collect()
}

/// Drop repeated ids, keeping first occurrences in order.
fn distinct(ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn tournament_id(req: &TournamentIdRequest) -> ApiResult<&str> {
    required(&req.tournament_id).ok_or_else(|| ApiError::bad_request("Tournament ID is required"))
}

fn invalidate_tournament_views(state: &AppState) {
    state
        .cache
        .invalidate_multiple(&[ONGOING_TOURNAMENT_KEY, PAST_TOURNAMENTS_KEY]);
}

pub async fn create_tournament(
    State(state): State<AppState>,
    payload: Result<Json<CreateTournamentRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;

    let new_players = match req.players {
        Some(ref players) if !players.is_empty() => inline_roster(players)?,
        _ => Vec::new(),
    };
    let roster = if new_players.is_empty() {
        req.player_ids.clone().unwrap_or_default()
    } else {
        new_players.iter().map(|p| p.id.clone()).collect()
    };
    let roster = distinct(
        roster
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect(),
    );

    if roster.len() < MIN_PLAYERS {
        return Err(ApiError::bad_request(format!(
            "At least {MIN_PLAYERS} players are required"
        )));
    }

    let pairs = total_pairs(roster.len());
    let matches_per_player = req
        .matches_per_player
        .ok_or_else(|| ApiError::bad_request("matchesPerPlayer is required"))?;
    if matches_per_player < i64::try_from(pairs).unwrap_or(i64::MAX) {
        return Err(ApiError::bad_request(format!(
            "matchesPerPlayer must be at least {pairs} for {} players",
            roster.len()
        )));
    }
    let max = max_matches_per_player(roster.len());
    if matches_per_player > i64::try_from(max).unwrap_or(i64::MAX) {
        return Err(ApiError::bad_request(format!(
            "matchesPerPlayer must be at most {max} for {} players",
            roster.len()
        )));
    }

    if new_players.is_empty() {
        let missing = state.db.missing_players(&roster).await?;
        if !missing.is_empty() {
            return Err(ApiError::not_found(format!(
                "Player not found: {}",
                missing.join(", ")
            )));
        }
    }

    let tournament = state
        .db
        .create_tournament(&new_players, &roster, matches_per_player)
        .await?;
    invalidate_tournament_views(&state);

    Ok(Json(json!({
        "tournamentId": tournament.id,
        "name": tournament.name,
    })))
}

pub async fn delete_tournament(
    State(state): State<AppState>,
    payload: Result<Json<TournamentIdRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let id = tournament_id(&req)?;

    if !state.db.delete_tournament(id).await? {
        return Err(ApiError::not_found("Tournament not found"));
    }
    invalidate_tournament_views(&state);
    tracing::info!("Deleted tournament {id}");
    Ok(Json(json!({ "message": "Tournament deleted successfully" })))
}

pub async fn end_league(
    State(state): State<AppState>,
    payload: Result<Json<TournamentIdRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let id = tournament_id(&req)?;

    match state.db.end_league(id).await? {
        EndLeague::Ended { winner_id } => {
            invalidate_tournament_views(&state);
            state.cache.invalidate(ALL_TIME_LEADERBOARD_KEY);
            tracing::info!("Ended league {id}, winner: {winner_id:?}");
            Ok(Json(json!({
                "success": true,
                "message": "League ended successfully",
            })))
        }
        EndLeague::NotFound => Err(ApiError::not_found("Tournament not found")),
        EndLeague::NotOngoing(status) => Err(ApiError::conflict(format!(
            "Tournament is already {status}"
        ))),
    }
}

pub async fn get_tournaments(
    State(state): State<AppState>,
    query: Result<Query<TournamentQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<TournamentSummary>>> {
    let Query(params) = query?;
    if let Some(ref status) = params.status {
        status
            .parse::<TournamentStatus>()
            .map_err(ApiError::BadRequest)?;
    }

    let filter = TournamentFilter {
        id: params.id,
        status: params.status,
        limit: params.limit,
    };
    Ok(Json(state.db.list_tournaments(&filter).await?))
}

pub async fn get_fixture_options(
    query: Result<Query<FixtureOptionsQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = query?;
    let players = params
        .players
        .filter(|n| *n >= MIN_PLAYERS)
        .ok_or_else(|| {
            ApiError::bad_request(format!("players must be at least {MIN_PLAYERS}"))
        })?;

    Ok(Json(json!({
        "players": players,
        "options": matches_per_player_options(players),
    })))
}
