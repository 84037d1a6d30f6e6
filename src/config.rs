// Application configuration, loaded from environment variables and CLI flags.

use std::path::PathBuf;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL (SQLite connection string).
    pub database_url: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Directory containing pre-built frontend files to serve.
    /// When set, the backend serves static files from this path.
    pub static_dir: Option<PathBuf>,
    /// JSON file backing the response cache. In-memory when unset.
    pub cache_file: Option<PathBuf>,
    /// Default lifetime of cached home-page aggregates.
    pub cache_ttl: Duration,
}

pub const DEFAULT_CACHE_TTL_SECS: u64 = 5 * 60;

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `DATABASE_URL` - SQLite connection string (default: `sqlite:league.db?mode=rwc`)
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `STATIC_DIR` - Path to frontend dist directory for static file serving
    /// - `CACHE_FILE` - Path to a JSON file that persists the response cache
    /// - `CACHE_TTL_SECS` - Default cache lifetime in seconds (default: 300)
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    /// - `--database <URL>` - Override the database URL
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let database_url = Self::parse_cli_value(args, "--database")
            .or_else(|| env("DATABASE_URL"))
            .unwrap_or_else(|| "sqlite:league.db?mode=rwc".to_string());

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = Self::parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(3000);

        let static_dir = env("STATIC_DIR").map(PathBuf::from);
        let cache_file = env("CACHE_FILE").map(PathBuf::from);

        let cache_ttl = env("CACHE_TTL_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_CACHE_TTL_SECS));

        Config {
            database_url,
            port,
            static_dir,
            cache_file,
            cache_ttl,
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}
