// Home page aggregate, served through the cache.

use axum::{extract::State, Json};
use serde::Serialize;

use super::AppState;
use crate::cache::{ALL_TIME_LEADERBOARD_KEY, ONGOING_TOURNAMENT_KEY, PAST_TOURNAMENTS_KEY};
use crate::db::{AllTimeStanding, TournamentFilter, TournamentStatus, TournamentSummary};
use crate::error::ApiResult;

const PAST_TOURNAMENTS: i64 = 3;
const LEADERBOARD_SIZE: i64 = 5;

#[derive(Serialize)]
pub struct HomeView {
    pub ongoing: Option<TournamentSummary>,
    pub past_tournaments: Vec<TournamentSummary>,
    pub leaderboard: Vec<AllTimeStanding>,
}

pub async fn get_home(State(state): State<AppState>) -> ApiResult<Json<HomeView>> {
    let db = state.db.clone();
    let ongoing = state
        .cached(ONGOING_TOURNAMENT_KEY, || async move {
            let filter = TournamentFilter {
                status: Some(TournamentStatus::Ongoing.to_string()),
                limit: Some(1),
                ..Default::default()
            };
            Ok::<_, sqlx::Error>(db.list_tournaments(&filter).await?.into_iter().next())
        })
        .await?;

    let db = state.db.clone();
    let past_tournaments = state
        .cached(PAST_TOURNAMENTS_KEY, || async move {
            let filter = TournamentFilter {
                status: Some(TournamentStatus::Finished.to_string()),
                limit: Some(PAST_TOURNAMENTS),
                ..Default::default()
            };
            db.list_tournaments(&filter).await
        })
        .await?;

    let db = state.db.clone();
    let leaderboard = state
        .cached(ALL_TIME_LEADERBOARD_KEY, || async move {
            db.all_time_leaderboard(Some(LEADERBOARD_SIZE)).await
        })
        .await?;

    Ok(Json(HomeView {
        ongoing,
        past_tournaments,
        leaderboard,
    }))
}
