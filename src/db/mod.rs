// Database access layer (SQLite via sqlx).

mod matches;
mod players;
mod standings;
mod tournaments;

pub use matches::{MatchFilter, MatchSelector, MatchUpdate, RecordedMatch};
pub use players::PlayerDeletion;
pub use tournaments::{EndLeague, RosterPlayer, TournamentFilter};

use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ── Status values ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Ongoing,
    Completed,
    Finished,
    Deleted,
}

impl TournamentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Finished => "finished",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            "finished" => Ok(Self::Finished),
            "deleted" => Ok(Self::Deleted),
            other => Err(format!("Unknown tournament status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    Completed,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            other => Err(format!("Unknown match status: {other}")),
        }
    }
}

pub const LEAGUE_ACTIVE: &str = "ACTIVE";
pub const LEAGUE_ENDED: &str = "ENDED";

// ── Rows ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub team_name: String,
    pub account_number: String,
    pub photo_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayerAudit {
    pub id: i64,
    pub player_id: String,
    pub action: String,
    pub old_values: Option<String>,
    pub new_values: Option<String>,
    pub changed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub matches_per_player: i64,
    pub status: String,
    pub created_at: String,
    pub completed_at: Option<String>,
}

/// Tournament row with roster and fixture counts.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TournamentSummary {
    pub id: String,
    pub name: String,
    pub matches_per_player: i64,
    pub status: String,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub player_count: i64,
    pub total_matches: i64,
    pub completed_matches: i64,
}

/// Match joined with both players' names and teams.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MatchDetail {
    pub id: String,
    pub tournament_id: String,
    pub player_a_id: String,
    pub player_b_id: String,
    pub goals_a: Option<i64>,
    pub goals_b: Option<i64>,
    pub status: String,
    pub league_status: String,
    pub match_date: String,
    pub player_a_name: String,
    pub team_a: String,
    pub player_b_name: String,
    pub team_b: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TournamentStats {
    pub tournament_id: String,
    pub player_id: String,
    pub games_played: i64,
    pub wins: i64,
    pub draws: i64,
    pub losses: i64,
    pub goals_scored: i64,
    pub goals_conceded: i64,
    pub points: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AllTimeStats {
    pub player_id: String,
    pub total_matches: i64,
    pub total_wins: i64,
    pub total_draws: i64,
    pub total_losses: i64,
    pub total_goals: i64,
    pub total_goals_conceded: i64,
    pub total_points: i64,
    pub tournaments_played: i64,
    pub tournaments_won: i64,
    pub biggest_win: Option<String>,
    pub best_team: Option<String>,
}

/// Per-tournament leaderboard row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TournamentStanding {
    pub id: String,
    pub name: String,
    pub team_name: String,
    pub photo_url: Option<String>,
    pub games_played: i64,
    pub wins: i64,
    pub draws: i64,
    pub losses: i64,
    pub goals_scored: i64,
    pub goals_conceded: i64,
    pub points: i64,
    pub win_percentage: f64,
    pub goal_difference: i64,
}

/// All-time leaderboard row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AllTimeStanding {
    pub id: String,
    pub name: String,
    pub team_name: String,
    pub photo_url: Option<String>,
    pub tournaments_played: i64,
    pub tournaments_won: i64,
    pub total_matches: i64,
    pub total_wins: i64,
    pub total_draws: i64,
    pub total_losses: i64,
    pub total_goals: i64,
    pub total_goals_conceded: i64,
    pub biggest_win: String,
    pub best_team: String,
    pub win_percentage: f64,
    pub total_points: i64,
}

// ── Ids ───────────────────────────────────────────────────────────────

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque id of the form `<prefix>_<unix millis>_<9 base36 chars>`.
pub fn generate_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!(
        "{prefix}_{}_{suffix}",
        chrono::Utc::now().timestamp_millis()
    )
}

// ── Database ──────────────────────────────────────────────────────────

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        // An in-memory database lives and dies with its connection.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Transaction holding the write lock from its first statement.
    ///
    /// A deferred transaction that reads before writing cannot upgrade its
    /// lock while another writer is active, and SQLite fails it with
    /// SQLITE_BUSY without honouring the busy timeout.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin_with("BEGIN IMMEDIATE").await
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                team_name TEXT NOT NULL,
                account_number TEXT NOT NULL DEFAULT '',
                photo_url TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS player_audit (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id TEXT NOT NULL,
                action TEXT NOT NULL,
                old_values TEXT,
                new_values TEXT,
                changed_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tournaments (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                matches_per_player INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'ongoing',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                completed_at TEXT
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tournament_players (
                tournament_id TEXT NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
                player_id TEXT NOT NULL REFERENCES players(id),
                PRIMARY KEY (tournament_id, player_id)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS matches (
                id TEXT PRIMARY KEY,
                tournament_id TEXT NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
                player_a_id TEXT NOT NULL REFERENCES players(id),
                player_b_id TEXT NOT NULL REFERENCES players(id),
                goals_a INTEGER,
                goals_b INTEGER,
                status TEXT NOT NULL DEFAULT 'scheduled',
                league_status TEXT NOT NULL DEFAULT 'ACTIVE',
                match_date TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_matches_tournament_status ON matches (tournament_id, status)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tournament_stats (
                tournament_id TEXT NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
                player_id TEXT NOT NULL REFERENCES players(id),
                games_played INTEGER NOT NULL DEFAULT 0,
                wins INTEGER NOT NULL DEFAULT 0,
                draws INTEGER NOT NULL DEFAULT 0,
                losses INTEGER NOT NULL DEFAULT 0,
                goals_scored INTEGER NOT NULL DEFAULT 0,
                goals_conceded INTEGER NOT NULL DEFAULT 0,
                points INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (tournament_id, player_id)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS all_time_stats (
                player_id TEXT PRIMARY KEY REFERENCES players(id),
                total_matches INTEGER NOT NULL DEFAULT 0,
                total_wins INTEGER NOT NULL DEFAULT 0,
                total_draws INTEGER NOT NULL DEFAULT 0,
                total_losses INTEGER NOT NULL DEFAULT 0,
                total_goals INTEGER NOT NULL DEFAULT 0,
                total_goals_conceded INTEGER NOT NULL DEFAULT 0,
                total_points INTEGER NOT NULL DEFAULT 0,
                tournaments_played INTEGER NOT NULL DEFAULT 0,
                tournaments_won INTEGER NOT NULL DEFAULT 0,
                biggest_win TEXT,
                best_team TEXT
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
