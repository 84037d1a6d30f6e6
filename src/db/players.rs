// Player CRUD with an append-only audit trail.

use serde::Serialize;
use sqlx::SqliteConnection;

use super::{generate_id, Database, Player, PlayerAudit};

const PLAYER_COLUMNS: &str =
    "id, name, team_name, account_number, photo_url, created_at, updated_at";

/// Result of a delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerDeletion {
    Deleted,
    NotFound,
    /// The player is on a tournament roster and cannot be removed.
    InUse,
}

/// Audit snapshot of the mutable player fields.
#[derive(Debug, Serialize)]
struct PlayerSnapshot<'a> {
    name: &'a str,
    team_name: &'a str,
    account_number: &'a str,
    photo_url: Option<&'a str>,
}

impl<'a> From<&'a Player> for PlayerSnapshot<'a> {
    fn from(p: &'a Player) -> Self {
        Self {
            name: &p.name,
            team_name: &p.team_name,
            account_number: &p.account_number,
            photo_url: p.photo_url.as_deref(),
        }
    }
}

fn encode_snapshot(snapshot: Option<&PlayerSnapshot<'_>>) -> Result<Option<String>, sqlx::Error> {
    snapshot
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

async fn write_audit(
    conn: &mut SqliteConnection,
    player_id: &str,
    action: &str,
    old: Option<&PlayerSnapshot<'_>>,
    new: Option<&PlayerSnapshot<'_>>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO player_audit (player_id, action, old_values, new_values) VALUES (?, ?, ?, ?)",
    )
    .bind(player_id)
    .bind(action)
    .bind(encode_snapshot(old)?)
    .bind(encode_snapshot(new)?)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(super) async fn fetch_player(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Player>, sqlx::Error> {
    sqlx::query_as::<_, Player>(&format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

impl Database {
    pub async fn create_player(
        &self,
        name: &str,
        team_name: &str,
        account_number: &str,
        photo_url: Option<&str>,
    ) -> Result<Player, sqlx::Error> {
        let mut tx = self.begin_write().await?;
        let player = sqlx::query_as::<_, Player>(&format!(
            "INSERT INTO players (id, name, team_name, account_number, photo_url) VALUES (?, ?, ?, ?, ?) RETURNING {PLAYER_COLUMNS}"
        ))
        .bind(generate_id("player"))
        .bind(name)
        .bind(team_name)
        .bind(account_number)
        .bind(photo_url)
        .fetch_one(&mut *tx)
        .await?;

        write_audit(
            &mut tx,
            &player.id,
            "CREATE",
            None,
            Some(&PlayerSnapshot::from(&player)),
        )
        .await?;
        tx.commit().await?;
        crate::metrics::PLAYERS_CREATED_TOTAL.inc();
        Ok(player)
    }

    pub async fn list_players(&self) -> Result<Vec<Player>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Player>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_player(&self, id: &str) -> Result<Option<Player>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        fetch_player(&mut conn, id).await
    }

    /// Ids from `ids` that have no player row.
    pub async fn missing_players(&self, ids: &[String]) -> Result<Vec<String>, sqlx::Error> {
        let mut missing = Vec::new();
        for id in ids {
            let exists: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM players WHERE id = ?)")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?;
            if exists == 0 {
                missing.push(id.clone());
            }
        }
        Ok(missing)
    }

    /// Update a player's details. The photo is only replaced when one is given.
    pub async fn update_player(
        &self,
        id: &str,
        name: &str,
        team_name: &str,
        account_number: &str,
        photo_url: Option<&str>,
    ) -> Result<Option<Player>, sqlx::Error> {
        let mut tx = self.begin_write().await?;
        let Some(old) = fetch_player(&mut tx, id).await? else {
            return Ok(None);
        };

        let updated = sqlx::query_as::<_, Player>(&format!(
            "UPDATE players SET name = ?, team_name = ?, account_number = ?, photo_url = COALESCE(?, photo_url), updated_at = datetime('now') WHERE id = ? RETURNING {PLAYER_COLUMNS}"
        ))
        .bind(name)
        .bind(team_name)
        .bind(account_number)
        .bind(photo_url)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        write_audit(
            &mut tx,
            id,
            "UPDATE",
            Some(&PlayerSnapshot::from(&old)),
            Some(&PlayerSnapshot::from(&updated)),
        )
        .await?;
        tx.commit().await?;
        Ok(Some(updated))
    }

    /// Delete a player, logging the removed row first.
    pub async fn delete_player(&self, id: &str) -> Result<PlayerDeletion, sqlx::Error> {
        let mut tx = self.begin_write().await?;
        let Some(old) = fetch_player(&mut tx, id).await? else {
            return Ok(PlayerDeletion::NotFound);
        };

        let on_roster: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM tournament_players WHERE player_id = ?)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if on_roster > 0 {
            return Ok(PlayerDeletion::InUse);
        }

        write_audit(&mut tx, id, "DELETE", Some(&PlayerSnapshot::from(&old)), None).await?;
        sqlx::query("DELETE FROM players WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(PlayerDeletion::Deleted)
    }

    pub async fn player_audit(&self, player_id: &str) -> Result<Vec<PlayerAudit>, sqlx::Error> {
        let rows = sqlx::query_as::<_, PlayerAudit>(
            "SELECT id, player_id, action, old_values, new_values, changed_at FROM player_audit WHERE player_id = ? ORDER BY id",
        )
        .bind(player_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
