// Leaderboards: per tournament and all time.

use super::{AllTimeStanding, Database, TournamentStanding};

impl Database {
    /// Every rostered player of a tournament, best first.
    pub async fn tournament_leaderboard(
        &self,
        tournament_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<TournamentStanding>, sqlx::Error> {
        let rows = sqlx::query_as::<_, TournamentStanding>(
            r#"
            SELECT p.id, p.name, p.team_name, p.photo_url,
                   COALESCE(ts.games_played, 0) AS games_played,
                   COALESCE(ts.wins, 0) AS wins,
                   COALESCE(ts.draws, 0) AS draws,
                   COALESCE(ts.losses, 0) AS losses,
                   COALESCE(ts.goals_scored, 0) AS goals_scored,
                   COALESCE(ts.goals_conceded, 0) AS goals_conceded,
                   COALESCE(ts.points, 0) AS points,
                   CASE WHEN COALESCE(ts.games_played, 0) > 0
                        THEN CAST(ts.wins AS REAL) * 100.0 / ts.games_played
                        ELSE 0.0 END AS win_percentage,
                   COALESCE(ts.goals_scored, 0) - COALESCE(ts.goals_conceded, 0) AS goal_difference
            FROM tournament_players tp
            JOIN players p ON p.id = tp.player_id
            LEFT JOIN tournament_stats ts
                   ON ts.tournament_id = tp.tournament_id AND ts.player_id = tp.player_id
            WHERE tp.tournament_id = ?
            ORDER BY points DESC, goals_scored DESC, p.id ASC
            LIMIT ?
        "#,
        )
        .bind(tournament_id)
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Players with any recorded result, by total points then goals.
    pub async fn all_time_leaderboard(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<AllTimeStanding>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AllTimeStanding>(
            r#"
            SELECT p.id, p.name, p.team_name, p.photo_url,
                   a.tournaments_played, a.tournaments_won,
                   a.total_matches, a.total_wins, a.total_draws, a.total_losses,
                   a.total_goals, a.total_goals_conceded,
                   COALESCE(a.biggest_win, '') AS biggest_win,
                   COALESCE(a.best_team, '') AS best_team,
                   CASE WHEN a.total_matches > 0
                        THEN CAST(a.total_wins AS REAL) * 100.0 / a.total_matches
                        ELSE 0.0 END AS win_percentage,
                   a.total_points
            FROM all_time_stats a
            JOIN players p ON p.id = a.player_id
            ORDER BY a.total_points DESC, a.total_goals DESC, p.id ASC
            LIMIT ?
        "#,
        )
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
