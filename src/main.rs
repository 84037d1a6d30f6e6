use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use league_backend::api::{self, AppState};
use league_backend::cache::{CacheManager, FileStorage};
use league_backend::config::Config;
use league_backend::db::Database;
use league_backend::metrics;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::load();
    metrics::register_metrics();

    let db = Arc::new(Database::new(&config.database_url).await?);

    let cache = match config.cache_file {
        Some(ref path) => {
            tracing::info!("Persisting cache to {}", path.display());
            CacheManager::new(Arc::new(FileStorage::open(path)?), config.cache_ttl)
        }
        None => CacheManager::in_memory(config.cache_ttl),
    };

    let mut app = api::router(AppState::new(db, cache));

    // Serve the pre-built frontend when configured.
    if let Some(ref dir) = config.static_dir {
        tracing::info!("Serving static files from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }

    let app = app
        .layer(axum::middleware::from_fn(metrics::track_requests))
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("League backend listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
