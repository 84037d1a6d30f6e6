// HTTP API routes (players, tournaments, results, leaderboards).

mod home;
mod matches;
mod players;
mod stats;
mod tournaments;

use axum::{
    http::header,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

use crate::cache::CacheManager;
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::metrics;

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub cache: CacheManager,
}

impl AppState {
    pub fn new(db: Arc<Database>, cache: CacheManager) -> Self {
        Self { db, cache }
    }

    /// Serve `key` from the cache, loading and storing it on a miss.
    ///
    /// A load that overlaps an invalidation is returned but not stored.
    async fn cached<T, F, Fut>(&self, key: &str, load: F) -> ApiResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        if let Some(hit) = self.cache.get::<T>(key) {
            return Ok(hit);
        }
        let generation = self.cache.generation();
        let fresh = load().await?;
        self.cache.set_if_current(key, &fresh, generation);
        Ok(fresh)
    }
}

// ── Router ────────────────────────────────────────────────────────────

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "league-backend" }))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Players
        .route(
            "/add-player",
            post(players::add_player).fallback(method_not_allowed),
        )
        .route(
            "/update-player",
            post(players::update_player).fallback(method_not_allowed),
        )
        .route(
            "/delete-player",
            post(players::delete_player).fallback(method_not_allowed),
        )
        .route(
            "/get-players",
            get(players::get_players).fallback(method_not_allowed),
        )
        // Tournaments
        .route(
            "/create-tournament",
            post(tournaments::create_tournament).fallback(method_not_allowed),
        )
        .route(
            "/delete-tournament",
            delete(tournaments::delete_tournament).fallback(method_not_allowed),
        )
        .route(
            "/end-league",
            post(tournaments::end_league).fallback(method_not_allowed),
        )
        .route(
            "/get-tournaments",
            get(tournaments::get_tournaments).fallback(method_not_allowed),
        )
        .route(
            "/get-fixture-options",
            get(tournaments::get_fixture_options).fallback(method_not_allowed),
        )
        // Matches
        .route(
            "/update-match",
            post(matches::update_match).fallback(method_not_allowed),
        )
        .route(
            "/get-matches",
            get(matches::get_matches).fallback(method_not_allowed),
        )
        // Leaderboards
        .route(
            "/get-stats",
            get(stats::get_stats).fallback(method_not_allowed),
        )
        .route("/home", get(home::get_home).fallback(method_not_allowed))
        // Operations
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Trimmed, non-empty value of an optional request field.
fn required<'a>(value: &'a Option<String>) -> Option<&'a str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
