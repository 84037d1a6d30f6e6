// Tournament creation, listing and completion.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::{
    generate_id, Database, MatchStatus, Tournament, TournamentStatus, TournamentSummary,
    LEAGUE_ACTIVE, LEAGUE_ENDED,
};
use crate::fixtures::generate_fixtures;

const TOURNAMENT_COLUMNS: &str = "id, name, matches_per_player, status, created_at, completed_at";

/// A player supplied inline with a create request; inserted if absent.
#[derive(Debug, Clone)]
pub struct RosterPlayer {
    pub id: String,
    pub name: String,
    pub team_name: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TournamentFilter {
    pub id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

/// Result of an explicit end-league request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndLeague {
    Ended { winner_id: Option<String> },
    NotFound,
    NotOngoing(String),
}

/// Close out a tournament: mark it finished, end its league, bump
/// tournaments_played for everyone who played and credit the leader.
///
/// Returns the credited winner, if any.
pub(super) async fn finish_tournament(
    conn: &mut SqliteConnection,
    tournament_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query(
        "UPDATE tournaments SET status = ?, completed_at = datetime('now') WHERE id = ?",
    )
    .bind(TournamentStatus::Finished.as_str())
    .bind(tournament_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query("UPDATE matches SET league_status = ? WHERE tournament_id = ?")
        .bind(LEAGUE_ENDED)
        .bind(tournament_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO all_time_stats (player_id, tournaments_played)
        SELECT player_id, 1 FROM tournament_stats
        WHERE tournament_id = ? AND games_played > 0
        ON CONFLICT(player_id) DO UPDATE SET tournaments_played = tournaments_played + 1
    "#,
    )
    .bind(tournament_id)
    .execute(&mut *conn)
    .await?;

    // Same ordering as the tournament leaderboard; ties resolve by player id.
    let winner: Option<String> = sqlx::query_scalar(
        r#"
        SELECT player_id FROM tournament_stats
        WHERE tournament_id = ? AND games_played > 0
        ORDER BY points DESC, goals_scored DESC, player_id ASC
        LIMIT 1
    "#,
    )
    .bind(tournament_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(ref winner_id) = winner {
        sqlx::query(
            "UPDATE all_time_stats SET tournaments_won = tournaments_won + 1 WHERE player_id = ?",
        )
        .bind(winner_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(winner)
}

impl Database {
    /// Create a tournament named `WEEK N` with the given roster and its full
    /// fixture list.
    ///
    /// `new_players` are inserted unless a player with the same id exists.
    /// `player_ids` is the ordered roster used for fixture generation.
    pub async fn create_tournament(
        &self,
        new_players: &[RosterPlayer],
        player_ids: &[String],
        matches_per_player: i64,
    ) -> Result<Tournament, sqlx::Error> {
        let mut tx = self.begin_write().await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tournaments")
            .fetch_one(&mut *tx)
            .await?;
        let name = format!("WEEK {}", count + 1);
        let tournament_id = generate_id("tournament");

        let tournament = sqlx::query_as::<_, Tournament>(&format!(
            "INSERT INTO tournaments (id, name, matches_per_player) VALUES (?, ?, ?) RETURNING {TOURNAMENT_COLUMNS}"
        ))
        .bind(&tournament_id)
        .bind(&name)
        .bind(matches_per_player)
        .fetch_one(&mut *tx)
        .await?;

        let mut players_created = 0;
        for player in new_players {
            let inserted = sqlx::query(
                "INSERT OR IGNORE INTO players (id, name, team_name, photo_url) VALUES (?, ?, ?, ?)",
            )
            .bind(&player.id)
            .bind(&player.name)
            .bind(&player.team_name)
            .bind(&player.photo_url)
            .execute(&mut *tx)
            .await?;
            players_created += inserted.rows_affected();
        }

        for player_id in player_ids {
            sqlx::query("INSERT INTO tournament_players (tournament_id, player_id) VALUES (?, ?)")
                .bind(&tournament_id)
                .bind(player_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                "INSERT OR IGNORE INTO tournament_stats (tournament_id, player_id) VALUES (?, ?)",
            )
            .bind(&tournament_id)
            .bind(player_id)
            .execute(&mut *tx)
            .await?;
        }

        let fixtures = generate_fixtures(
            &tournament_id,
            player_ids,
            usize::try_from(matches_per_player).unwrap_or(0),
        );
        for fixture in &fixtures {
            sqlx::query(
                "INSERT INTO matches (id, tournament_id, player_a_id, player_b_id, status, league_status) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&fixture.id)
            .bind(&tournament_id)
            .bind(&fixture.player_a_id)
            .bind(&fixture.player_b_id)
            .bind(MatchStatus::Scheduled.as_str())
            .bind(LEAGUE_ACTIVE)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        crate::metrics::PLAYERS_CREATED_TOTAL.inc_by(players_created);
        crate::metrics::TOURNAMENTS_CREATED_TOTAL.inc();
        tracing::info!(
            "Created tournament {} ({}) with {} players and {} fixtures",
            tournament.name,
            tournament.id,
            player_ids.len(),
            fixtures.len()
        );
        Ok(tournament)
    }

    pub async fn get_tournament(&self, id: &str) -> Result<Option<Tournament>, sqlx::Error> {
        let row = sqlx::query_as::<_, Tournament>(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Tournaments with roster and fixture counts, newest first.
    pub async fn list_tournaments(
        &self,
        filter: &TournamentFilter,
    ) -> Result<Vec<TournamentSummary>, sqlx::Error> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT t.id, t.name, t.matches_per_player, t.status, t.created_at, t.completed_at,
                   COUNT(DISTINCT tp.player_id) AS player_count,
                   COUNT(DISTINCT m.id) AS total_matches,
                   COUNT(DISTINCT CASE WHEN m.status = 'completed' THEN m.id END) AS completed_matches
            FROM tournaments t
            LEFT JOIN tournament_players tp ON t.id = tp.tournament_id
            LEFT JOIN matches m ON t.id = m.tournament_id
            WHERE 1 = 1
        "#,
        );
        if let Some(ref id) = filter.id {
            qb.push(" AND t.id = ").push_bind(id.clone());
        }
        if let Some(ref status) = filter.status {
            qb.push(" AND t.status = ").push_bind(status.clone());
        }
        qb.push(" GROUP BY t.id ORDER BY t.created_at DESC, t.rowid DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        let rows = qb
            .build_query_as::<TournamentSummary>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Soft delete: the tournament keeps its rows with status `deleted`.
    ///
    /// Returns false for unknown or already deleted tournaments.
    pub async fn delete_tournament(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE tournaments SET status = ?1 WHERE id = ?2 AND status != ?1")
            .bind(TournamentStatus::Deleted.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// End an ongoing league before all fixtures are played.
    pub async fn end_league(&self, id: &str) -> Result<EndLeague, sqlx::Error> {
        let mut tx = self.begin_write().await?;
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM tournaments WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        match status {
            None => Ok(EndLeague::NotFound),
            Some(s) if s != TournamentStatus::Ongoing.as_str() => Ok(EndLeague::NotOngoing(s)),
            Some(_) => {
                let winner_id = finish_tournament(&mut tx, id).await?;
                tx.commit().await?;
                crate::metrics::TOURNAMENTS_FINISHED_TOTAL
                    .with_label_values(&["ended"])
                    .inc();
                Ok(EndLeague::Ended { winner_id })
            }
        }
    }
}
