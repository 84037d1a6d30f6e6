// Prometheus metrics definitions for the league backend.

use axum::{extract::Request, middleware::Next, response::Response};
use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Once;
use std::time::Instant;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Counters ─────────────────────────────────────────────────────

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("league_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    /// Players registered through add-player or tournament creation.
    pub static ref PLAYERS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "league_players_created_total",
        "Players registered",
    )
    .unwrap();

    pub static ref TOURNAMENTS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "league_tournaments_created_total",
        "Tournaments created",
    )
    .unwrap();

    /// Tournaments finished, by how they ended (auto, ended).
    pub static ref TOURNAMENTS_FINISHED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("league_tournaments_finished_total", "Tournaments finished"),
        &["reason"],
    )
    .unwrap();

    /// Match results recorded, by outcome from player A's side.
    pub static ref MATCHES_RECORDED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("league_matches_recorded_total", "Match results recorded"),
        &["outcome"],
    )
    .unwrap();

    /// Cache lookups, by result (hit, miss).
    pub static ref CACHE_LOOKUPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("league_cache_lookups_total", "Cache lookups"),
        &["result"],
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "league_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        &["endpoint"],
    )
    .unwrap();
}

static REGISTER: Once = Once::new();

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(API_REQUESTS_TOTAL.clone()),
            Box::new(PLAYERS_CREATED_TOTAL.clone()),
            Box::new(TOURNAMENTS_CREATED_TOTAL.clone()),
            Box::new(TOURNAMENTS_FINISHED_TOTAL.clone()),
            Box::new(MATCHES_RECORDED_TOTAL.clone()),
            Box::new(CACHE_LOOKUPS_TOTAL.clone()),
            Box::new(API_REQUEST_DURATION_SECONDS.clone()),
        ];

        for c in collectors {
            if let Err(e) = REGISTRY.register(c) {
                tracing::warn!("Failed to register metric: {e}");
            }
        }
    });
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Normalize a URL path for metric labels: anything outside the API surface
/// (static assets) collapses to `/static` to bound label cardinality.
pub fn normalize_path(path: &str) -> String {
    const API_PATHS: &[&str] = &[
        "/add-player",
        "/update-player",
        "/delete-player",
        "/create-tournament",
        "/delete-tournament",
        "/end-league",
        "/update-match",
        "/get-players",
        "/get-tournaments",
        "/get-matches",
        "/get-stats",
        "/get-fixture-options",
        "/home",
        "/health",
        "/metrics",
    ];
    let trimmed = path.trim_end_matches('/');
    match API_PATHS.iter().find(|p| **p == trimmed) {
        Some(p) => p.to_string(),
        None => "/static".to_string(),
    }
}

/// Middleware recording request counts and latency.
pub async fn track_requests(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = normalize_path(req.uri().path());
    let started = Instant::now();

    let response = next.run(req).await;

    API_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint.as_str()])
        .observe(started.elapsed().as_secs_f64());
    API_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), endpoint.as_str(), response.status().as_str()])
        .inc();
    response
}
