// Player handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{required, AppState};
use crate::cache::ALL_TIME_LEADERBOARD_KEY;
use crate::db::{Player, PlayerDeletion};
use crate::error::{ApiError, ApiResult};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest {
    pub player_id: Option<String>,
    pub name: Option<String>,
    pub team_name: Option<String>,
    pub account_number: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePlayerRequest {
    pub player_id: Option<String>,
}

struct PlayerFields<'a> {
    name: &'a str,
    team_name: &'a str,
    account_number: &'a str,
    photo_url: Option<&'a str>,
}

fn player_fields(req: &PlayerRequest) -> ApiResult<PlayerFields<'_>> {
    match (
        required(&req.name),
        required(&req.team_name),
        required(&req.account_number),
    ) {
        (Some(name), Some(team_name), Some(account_number)) => Ok(PlayerFields {
            name,
            team_name,
            account_number,
            photo_url: required(&req.photo_url),
        }),
        _ => Err(ApiError::bad_request("Missing required fields")),
    }
}

fn player_body(player: &Player) -> Json<Value> {
    Json(json!({
        "playerId": player.id,
        "name": player.name,
        "teamName": player.team_name,
        "accountNumber": player.account_number,
    }))
}

pub async fn add_player(
    State(state): State<AppState>,
    payload: Result<Json<PlayerRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let fields = player_fields(&req)?;

    let player = state
        .db
        .create_player(
            fields.name,
            fields.team_name,
            fields.account_number,
            fields.photo_url,
        )
        .await?;
    tracing::info!("Added player {} ({})", player.name, player.id);
    Ok(player_body(&player))
}

pub async fn update_player(
    State(state): State<AppState>,
    payload: Result<Json<PlayerRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let player_id = required(&req.player_id)
        .ok_or_else(|| ApiError::bad_request("Player ID is required"))?;
    let fields = player_fields(&req)?;

    let player = state
        .db
        .update_player(
            player_id,
            fields.name,
            fields.team_name,
            fields.account_number,
            fields.photo_url,
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Player not found"))?;

    // Leaderboard rows carry the player's name and team.
    state.cache.invalidate(ALL_TIME_LEADERBOARD_KEY);
    tracing::info!("Updated player {}", player.id);
    Ok(player_body(&player))
}

pub async fn delete_player(
    State(state): State<AppState>,
    payload: Result<Json<DeletePlayerRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let player_id = required(&req.player_id)
        .ok_or_else(|| ApiError::bad_request("Player ID is required"))?;

    match state.db.delete_player(player_id).await? {
        PlayerDeletion::Deleted => {
            state.cache.invalidate(ALL_TIME_LEADERBOARD_KEY);
            tracing::info!("Deleted player {player_id}");
            Ok(Json(json!({ "message": "Player deleted successfully" })))
        }
        PlayerDeletion::NotFound => Err(ApiError::not_found("Player not found")),
        PlayerDeletion::InUse => Err(ApiError::conflict(
            "Player is part of a tournament and cannot be deleted",
        )),
    }
}

pub async fn get_players(State(state): State<AppState>) -> ApiResult<Json<Vec<Player>>> {
    Ok(Json(state.db.list_players().await?))
}
