// Router-level tests: requests go through the full axum stack against an
// in-memory database.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use league_backend::api::{self, AppState};
use league_backend::cache::{CacheManager, ONGOING_TOURNAMENT_KEY};
use league_backend::db::Database;

async fn test_app() -> (Router, AppState) {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let state = AppState::new(Arc::new(db), CacheManager::in_memory(Duration::from_secs(60)));
    (api::router(state.clone()), state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

async fn add_player(app: &Router, name: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/add-player",
        Some(json!({
            "name": name,
            "teamName": format!("{name} FC"),
            "accountNumber": "0001",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["playerId"].as_str().unwrap().to_string()
}

async fn create_tournament(app: &Router, ids: &[String], matches_per_player: i64) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/create-tournament",
        Some(json!({ "playerIds": ids, "matchesPerPlayer": matches_per_player })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["tournamentId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_player_lifecycle() {
    let (app, _) = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/add-player",
        Some(json!({
            "name": "Alice",
            "teamName": "Arsenal",
            "accountNumber": "123",
            "photoUrl": "https://img/alice.png",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["teamName"], "Arsenal");
    assert_eq!(body["accountNumber"], "123");
    let id = body["playerId"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/update-player",
        Some(json!({
            "playerId": id,
            "name": "Alice",
            "teamName": "Ajax",
            "accountNumber": "123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["teamName"], "Ajax");

    let (status, players) = send(&app, "GET", "/get-players", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(players[0]["team_name"], "Ajax");
    assert_eq!(players[0]["photo_url"], "https://img/alice.png");

    let (status, body) = send(&app, "POST", "/delete-player", Some(json!({ "playerId": id }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Player deleted successfully");

    let (status, body) = send(&app, "POST", "/delete-player", Some(json!({ "playerId": id }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Player not found");
}

#[tokio::test]
async fn test_validation_errors() {
    let (app, _) = test_app().await;

    let (status, body) = send(&app, "POST", "/add-player", Some(json!({ "name": "Bob" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");

    let (status, body) = send(
        &app,
        "POST",
        "/update-player",
        Some(json!({ "playerId": "player_missing", "name": "X", "teamName": "Y", "accountNumber": "Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    // Malformed JSON is a client error with a JSON body.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/add-player")
                .header("content-type", "application/json")
                .body(Body::from("{ not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_method_is_405() {
    let (app, _) = test_app().await;

    let (status, body) = send(&app, "GET", "/add-player", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Method Not Allowed");

    let (status, _) = send(
        &app,
        "POST",
        "/delete-tournament",
        Some(json!({ "tournamentId": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = send(&app, "POST", "/get-stats", Some(json!({}))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_create_tournament_validation() {
    let (app, _) = test_app().await;
    let a = add_player(&app, "A").await;
    let b = add_player(&app, "B").await;
    let c = add_player(&app, "C").await;

    let (status, _) = send(
        &app,
        "POST",
        "/create-tournament",
        Some(json!({ "playerIds": [a, b], "matchesPerPlayer": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Duplicates collapse to two players.
    let (status, _) = send(
        &app,
        "POST",
        "/create-tournament",
        Some(json!({ "playerIds": [a, b, a], "matchesPerPlayer": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/create-tournament",
        Some(json!({ "playerIds": [a, b, c], "matchesPerPlayer": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "matchesPerPlayer must be at least 3 for 3 players");

    let (status, body) = send(
        &app,
        "POST",
        "/create-tournament",
        Some(json!({ "playerIds": [a, b, "ghost"], "matchesPerPlayer": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Player not found: ghost");
}

#[tokio::test]
async fn test_create_tournament_rejects_oversized_schedule() {
    let (app, _) = test_app().await;
    let ids = vec![
        add_player(&app, "A").await,
        add_player(&app, "B").await,
        add_player(&app, "C").await,
    ];

    for matches_per_player in [37, 1_000_000_000, i64::MAX] {
        let (status, body) = send(
            &app,
            "POST",
            "/create-tournament",
            Some(json!({ "playerIds": ids, "matchesPerPlayer": matches_per_player })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "matchesPerPlayer must be at most 36 for 3 players");
    }

    // The largest offered option is still accepted.
    let tid = create_tournament(&app, &ids, 36).await;
    let (_, matches) = send(
        &app,
        "GET",
        &format!("/get-matches?tournament_id={tid}"),
        None,
    )
    .await;
    assert_eq!(matches.as_array().unwrap().len(), 72);

    let (_, listed) = send(&app, "GET", "/get-tournaments", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_tournament_with_inline_players() {
    let (app, _) = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/create-tournament",
        Some(json!({
            "players": [
                { "id": "p1", "name": "One", "teamName": "Roma" },
                { "id": "p2", "name": "Two", "teamName": "Lazio" },
                { "name": "Three", "teamName": "Napoli" },
            ],
            "matchesPerPlayer": 6,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "WEEK 1");
    let tid = body["tournamentId"].as_str().unwrap().to_string();

    let (_, players) = send(&app, "GET", "/get-players", None).await;
    assert_eq!(players.as_array().unwrap().len(), 3);

    let (_, matches) = send(&app, "GET", &format!("/get-matches?tournament_id={tid}"), None).await;
    assert_eq!(matches.as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn test_full_tournament_flow() {
    let (app, _) = test_app().await;
    let ids = vec![
        add_player(&app, "A").await,
        add_player(&app, "B").await,
        add_player(&app, "C").await,
    ];
    let tid = create_tournament(&app, &ids, 3).await;

    let (_, summary) = send(&app, "GET", &format!("/get-tournaments?id={tid}"), None).await;
    assert_eq!(summary[0]["name"], "WEEK 1");
    assert_eq!(summary[0]["player_count"], 3);
    assert_eq!(summary[0]["total_matches"], 6);

    // Rostered players cannot be deleted.
    let (status, _) = send(&app, "POST", "/delete-player", Some(json!({ "playerId": ids[0] }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, fixtures) = send(
        &app,
        "GET",
        &format!("/get-matches?tournament_id={tid}&status=scheduled"),
        None,
    )
    .await;
    let fixtures = fixtures.as_array().unwrap().clone();
    assert_eq!(fixtures.len(), 6);

    for (i, fixture) in fixtures.iter().enumerate() {
        let (status, body) = send(
            &app,
            "POST",
            "/update-match",
            Some(json!({ "matchId": fixture["id"], "goalsA": 2, "goalsB": i % 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["success"], true);
    }

    // Every fixture is played; the pair lookup reports a conflict.
    let (status, body) = send(
        &app,
        "POST",
        "/update-match",
        Some(json!({
            "tournamentId": tid,
            "playerAId": ids[0],
            "playerBId": ids[1],
            "goalsA": 1,
            "goalsB": 0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        "/update-match",
        Some(json!({ "matchId": fixtures[0]["id"], "goalsA": 9, "goalsB": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Match has already been played");

    let (_, tournaments) = send(&app, "GET", "/get-tournaments?status=finished", None).await;
    assert_eq!(tournaments.as_array().unwrap().len(), 1);
    assert_eq!(tournaments[0]["completed_matches"], 6);

    let (status, board) = send(
        &app,
        "GET",
        &format!("/get-stats?type=tournament&tournament_id={tid}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let points: i64 = board
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["points"].as_i64().unwrap())
        .sum();
    // 3 wins (2-1) and 3 wins (2-0): every game decisive.
    assert_eq!(points, 18);

    let (status, all_time) = send(&app, "GET", "/get-stats?type=all-time&limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all_time.as_array().unwrap().len(), 2);
    assert_eq!(all_time[0]["tournaments_played"], 1);
}

#[tokio::test]
async fn test_unknown_match_is_404() {
    let (app, _) = test_app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/update-match",
        Some(json!({ "matchId": "match_nope", "goalsA": 1, "goalsB": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No match found");

    let (status, _) = send(
        &app,
        "POST",
        "/update-match",
        Some(json!({ "matchId": "match_nope", "goalsA": -1, "goalsB": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_scores_leave_leaderboards_intact() {
    let (app, _) = test_app().await;
    let ids = vec![
        add_player(&app, "A").await,
        add_player(&app, "B").await,
        add_player(&app, "C").await,
    ];
    let tid = create_tournament(&app, &ids, 3).await;
    let (_, fixtures) = send(
        &app,
        "GET",
        &format!("/get-matches?tournament_id={tid}&status=scheduled"),
        None,
    )
    .await;
    let fixtures = fixtures.as_array().unwrap().clone();

    for goals_a in [100, i64::MAX] {
        let (status, body) = send(
            &app,
            "POST",
            "/update-match",
            Some(json!({ "matchId": fixtures[0]["id"], "goalsA": goals_a, "goalsB": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "goalsA and goalsB must be integers between 0 and 99");
    }

    let (status, _) = send(
        &app,
        "POST",
        "/update-match",
        Some(json!({ "matchId": fixtures[1]["id"], "goalsA": 99, "goalsB": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, board) = send(
        &app,
        "GET",
        &format!("/get-stats?type=tournament&tournament_id={tid}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let goals: i64 = board
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["goals_scored"].as_i64().unwrap())
        .sum();
    assert_eq!(goals, 99);

    let (status, _) = send(&app, "GET", "/get-stats?type=all-time", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_end_and_delete_tournament() {
    let (app, _) = test_app().await;
    let ids = vec![
        add_player(&app, "A").await,
        add_player(&app, "B").await,
        add_player(&app, "C").await,
    ];
    let tid = create_tournament(&app, &ids, 3).await;

    let (status, body) = send(&app, "POST", "/end-league", Some(json!({ "tournamentId": tid }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(&app, "POST", "/end-league", Some(json!({ "tournamentId": tid }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, matches) = send(&app, "GET", &format!("/get-matches?tournament_id={tid}"), None).await;
    assert!(matches
        .as_array()
        .unwrap()
        .iter()
        .all(|m| m["league_status"] == "ENDED"));

    let (status, body) = send(
        &app,
        "DELETE",
        "/delete-tournament",
        Some(json!({ "tournamentId": tid })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Tournament deleted successfully");

    let (_, deleted) = send(&app, "GET", "/get-tournaments?status=deleted", None).await;
    assert_eq!(deleted[0]["id"], tid.as_str());

    let (status, _) = send(
        &app,
        "DELETE",
        "/delete-tournament",
        Some(json!({ "tournamentId": tid })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "DELETE",
        "/delete-tournament",
        Some(json!({ "tournamentId": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", "/end-league", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_query_validation() {
    let (app, _) = test_app().await;

    let (status, body) = send(&app, "GET", "/get-stats?type=weekly", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid type parameter");

    let (status, _) = send(&app, "GET", "/get-stats?type=tournament", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/get-tournaments?status=paused", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/get-matches?limit=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fixture_options() {
    let (app, _) = test_app().await;

    let (status, body) = send(&app, "GET", "/get-fixture-options?players=4", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["players"], 4);
    assert_eq!(body["options"], json!([12, 24, 36, 48, 60, 72]));

    let (status, _) = send(&app, "GET", "/get-fixture-options?players=2", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_home_is_cached_and_invalidated() {
    let (app, state) = test_app().await;

    let (status, home) = send(&app, "GET", "/home", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(home["ongoing"].is_null());
    assert_eq!(home["past_tournaments"], json!([]));
    assert_eq!(home["leaderboard"], json!([]));

    // The empty result is now cached.
    assert!(state
        .cache
        .get::<Option<Value>>(ONGOING_TOURNAMENT_KEY)
        .is_some());

    let ids = vec![
        add_player(&app, "A").await,
        add_player(&app, "B").await,
        add_player(&app, "C").await,
    ];
    let tid = create_tournament(&app, &ids, 3).await;

    let (_, home) = send(&app, "GET", "/home", None).await;
    assert_eq!(home["ongoing"]["id"], tid.as_str());

    let (status, _) = send(
        &app,
        "POST",
        "/update-match",
        Some(json!({
            "tournamentId": tid,
            "playerAId": ids[0],
            "playerBId": ids[1],
            "goalsA": 3,
            "goalsB": 0,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, home) = send(&app, "GET", "/home", None).await;
    assert_eq!(home["leaderboard"][0]["id"], ids[0].as_str());
    assert_eq!(home["leaderboard"][0]["biggest_win"], "3-0");
}

#[tokio::test]
async fn test_health_and_metrics() {
    let (app, _) = test_app().await;
    league_backend::metrics::register_metrics();

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    add_player(&app, "M").await;
    let (status, body) = send(&app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_str()
        .unwrap()
        .contains("league_players_created_total"));
}
