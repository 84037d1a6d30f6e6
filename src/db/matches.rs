// Match listing and result recording.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::tournaments::finish_tournament;
use super::{AllTimeStats, Database, MatchDetail, MatchStatus, TournamentStats, TournamentStatus};
use crate::stats::MatchLine;

/// How an update-match request identifies its match.
#[derive(Debug, Clone, Copy)]
pub enum MatchSelector<'a> {
    Id(&'a str),
    /// The first scheduled fixture for this directed pair.
    Pair {
        tournament_id: &'a str,
        player_a_id: &'a str,
        player_b_id: &'a str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMatch {
    pub match_id: String,
    pub tournament_id: String,
    pub tournament_finished: bool,
    pub winner_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchUpdate {
    Recorded(RecordedMatch),
    NotFound,
    AlreadyPlayed,
    /// The tournament was ended or deleted before this fixture was played.
    TournamentClosed(String),
}

#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub tournament_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct MatchRow {
    id: String,
    tournament_id: String,
    player_a_id: String,
    player_b_id: String,
    status: String,
}

const MATCH_ROW_COLUMNS: &str = "id, tournament_id, player_a_id, player_b_id, status";

async fn resolve_match(
    conn: &mut SqliteConnection,
    selector: MatchSelector<'_>,
) -> Result<Result<MatchRow, MatchUpdate>, sqlx::Error> {
    match selector {
        MatchSelector::Id(id) => {
            let row = sqlx::query_as::<_, MatchRow>(&format!(
                "SELECT {MATCH_ROW_COLUMNS} FROM matches WHERE id = ?"
            ))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
            Ok(row.ok_or(MatchUpdate::NotFound))
        }
        MatchSelector::Pair {
            tournament_id,
            player_a_id,
            player_b_id,
        } => {
            let scheduled = sqlx::query_as::<_, MatchRow>(&format!(
                r#"
                SELECT {MATCH_ROW_COLUMNS} FROM matches
                WHERE tournament_id = ? AND player_a_id = ? AND player_b_id = ? AND status = ?
                ORDER BY rowid
                LIMIT 1
            "#
            ))
            .bind(tournament_id)
            .bind(player_a_id)
            .bind(player_b_id)
            .bind(MatchStatus::Scheduled.as_str())
            .fetch_optional(&mut *conn)
            .await?;
            if let Some(row) = scheduled {
                return Ok(Ok(row));
            }

            let played: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM matches WHERE tournament_id = ? AND player_a_id = ? AND player_b_id = ?",
            )
            .bind(tournament_id)
            .bind(player_a_id)
            .bind(player_b_id)
            .fetch_one(&mut *conn)
            .await?;
            Ok(Err(if played > 0 {
                MatchUpdate::AlreadyPlayed
            } else {
                MatchUpdate::NotFound
            }))
        }
    }
}

/// Add one side of a result to the tournament and all-time tables.
async fn apply_line(
    conn: &mut SqliteConnection,
    tournament_id: &str,
    player_id: &str,
    line: &MatchLine,
) -> Result<(), sqlx::Error> {
    let (wins, draws, losses) = line.outcome.tally();
    let team_name: Option<String> = sqlx::query_scalar("SELECT team_name FROM players WHERE id = ?")
        .bind(player_id)
        .fetch_optional(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO tournament_stats
            (tournament_id, player_id, games_played, wins, draws, losses, goals_scored, goals_conceded, points)
        VALUES (?, ?, 1, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(tournament_id, player_id) DO UPDATE SET
            games_played = games_played + 1,
            wins = wins + excluded.wins,
            draws = draws + excluded.draws,
            losses = losses + excluded.losses,
            goals_scored = goals_scored + excluded.goals_scored,
            goals_conceded = goals_conceded + excluded.goals_conceded,
            points = points + excluded.points
    "#,
    )
    .bind(tournament_id)
    .bind(player_id)
    .bind(wins)
    .bind(draws)
    .bind(losses)
    .bind(line.goals_for)
    .bind(line.goals_against)
    .bind(line.points())
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO all_time_stats
            (player_id, total_matches, total_wins, total_draws, total_losses, total_goals, total_goals_conceded, total_points, best_team)
        VALUES (?, 1, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(player_id) DO UPDATE SET
            total_matches = total_matches + 1,
            total_wins = total_wins + excluded.total_wins,
            total_draws = total_draws + excluded.total_draws,
            total_losses = total_losses + excluded.total_losses,
            total_goals = total_goals + excluded.total_goals,
            total_goals_conceded = total_goals_conceded + excluded.total_goals_conceded,
            total_points = total_points + excluded.total_points,
            best_team = excluded.best_team
    "#,
    )
    .bind(player_id)
    .bind(wins)
    .bind(draws)
    .bind(losses)
    .bind(line.goals_for)
    .bind(line.goals_against)
    .bind(line.points())
    .bind(team_name)
    .execute(&mut *conn)
    .await?;

    if let Some(win) = line.as_win() {
        let stored: Option<String> =
            sqlx::query_scalar("SELECT biggest_win FROM all_time_stats WHERE player_id = ?")
                .bind(player_id)
                .fetch_one(&mut *conn)
                .await?;
        if win.beats(stored.as_deref()) {
            sqlx::query("UPDATE all_time_stats SET biggest_win = ? WHERE player_id = ?")
                .bind(win.to_string())
                .bind(player_id)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}

impl Database {
    /// Record a result and update every derived table in one transaction.
    ///
    /// Finishes the tournament when this was its last scheduled match.
    pub async fn record_result(
        &self,
        selector: MatchSelector<'_>,
        goals_a: i64,
        goals_b: i64,
    ) -> Result<MatchUpdate, sqlx::Error> {
        let mut tx = self.begin_write().await?;

        let m = match resolve_match(&mut tx, selector).await? {
            Ok(m) => m,
            Err(outcome) => return Ok(outcome),
        };
        if m.status != MatchStatus::Scheduled.as_str() {
            return Ok(MatchUpdate::AlreadyPlayed);
        }

        let tournament_status: Option<String> =
            sqlx::query_scalar("SELECT status FROM tournaments WHERE id = ?")
                .bind(&m.tournament_id)
                .fetch_optional(&mut *tx)
                .await?;
        match tournament_status {
            Some(s) if s == TournamentStatus::Ongoing.as_str() => {}
            Some(s) => return Ok(MatchUpdate::TournamentClosed(s)),
            None => return Ok(MatchUpdate::NotFound),
        }

        // Guarded flip: a concurrent writer that got here first wins.
        let flipped = sqlx::query(
            r#"
            UPDATE matches
            SET goals_a = ?, goals_b = ?, status = ?, match_date = datetime('now')
            WHERE id = ? AND status = ?
        "#,
        )
        .bind(goals_a)
        .bind(goals_b)
        .bind(MatchStatus::Completed.as_str())
        .bind(&m.id)
        .bind(MatchStatus::Scheduled.as_str())
        .execute(&mut *tx)
        .await?;
        if flipped.rows_affected() == 0 {
            return Ok(MatchUpdate::AlreadyPlayed);
        }

        let (line_a, line_b) = MatchLine::pair(goals_a, goals_b);
        apply_line(&mut tx, &m.tournament_id, &m.player_a_id, &line_a).await?;
        apply_line(&mut tx, &m.tournament_id, &m.player_b_id, &line_b).await?;

        let remaining: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM matches WHERE tournament_id = ? AND status = ?",
        )
        .bind(&m.tournament_id)
        .bind(MatchStatus::Scheduled.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let (tournament_finished, winner_id) = if remaining == 0 {
            (true, finish_tournament(&mut tx, &m.tournament_id).await?)
        } else {
            (false, None)
        };

        tx.commit().await?;

        crate::metrics::MATCHES_RECORDED_TOTAL
            .with_label_values(&[line_a.outcome.as_str()])
            .inc();
        if tournament_finished {
            crate::metrics::TOURNAMENTS_FINISHED_TOTAL
                .with_label_values(&["auto"])
                .inc();
            tracing::info!(
                "Tournament {} finished, winner: {:?}",
                m.tournament_id,
                winner_id
            );
        }

        Ok(MatchUpdate::Recorded(RecordedMatch {
            match_id: m.id,
            tournament_id: m.tournament_id,
            tournament_finished,
            winner_id,
        }))
    }

    /// Matches with player names and teams, most recently played first.
    pub async fn list_matches(&self, filter: &MatchFilter) -> Result<Vec<MatchDetail>, sqlx::Error> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT m.id, m.tournament_id, m.player_a_id, m.player_b_id,
                   m.goals_a, m.goals_b, m.status, m.league_status, m.match_date,
                   pa.name AS player_a_name, pa.team_name AS team_a,
                   pb.name AS player_b_name, pb.team_name AS team_b
            FROM matches m
            JOIN players pa ON m.player_a_id = pa.id
            JOIN players pb ON m.player_b_id = pb.id
            WHERE 1 = 1
        "#,
        );
        if let Some(ref tournament_id) = filter.tournament_id {
            qb.push(" AND m.tournament_id = ").push_bind(tournament_id.clone());
        }
        if let Some(ref status) = filter.status {
            qb.push(" AND m.status = ").push_bind(status.clone());
        }
        qb.push(" ORDER BY m.match_date DESC, m.rowid ASC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        let rows = qb
            .build_query_as::<MatchDetail>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn tournament_stats(
        &self,
        tournament_id: &str,
        player_id: &str,
    ) -> Result<Option<TournamentStats>, sqlx::Error> {
        let row = sqlx::query_as::<_, TournamentStats>(
            r#"
            SELECT tournament_id, player_id, games_played, wins, draws, losses,
                   goals_scored, goals_conceded, points
            FROM tournament_stats WHERE tournament_id = ? AND player_id = ?
        "#,
        )
        .bind(tournament_id)
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn all_time_stats(&self, player_id: &str) -> Result<Option<AllTimeStats>, sqlx::Error> {
        let row = sqlx::query_as::<_, AllTimeStats>(
            r#"
            SELECT player_id, total_matches, total_wins, total_draws, total_losses,
                   total_goals, total_goals_conceded, total_points,
                   tournaments_played, tournaments_won, biggest_win, best_team
            FROM all_time_stats WHERE player_id = ?
        "#,
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
