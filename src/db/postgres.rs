//! PostgreSQL engine for the games store.
//!
//! The server serializes concurrent writers itself, so operations go
//! straight through the pool without extra locking.

use chrono::Utc;
use deadpool_postgres::{Pool, Runtime};
use tokio_postgres::NoTls;

use super::Game;
use crate::config::DbHost;
use crate::error::Result;

const SQL_CREATE_GAMES_TABLE: &str = "CREATE TABLE IF NOT EXISTS games (
    id BIGSERIAL PRIMARY KEY,
    app_id BIGINT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    singleplayer BOOLEAN NOT NULL DEFAULT FALSE,
    multiplayer BOOLEAN NOT NULL DEFAULT FALSE,
    online_multiplayer BOOLEAN NOT NULL DEFAULT FALSE,
    local_multiplayer BOOLEAN NOT NULL DEFAULT FALSE,
    last_update BIGINT NOT NULL DEFAULT 0,
    players BIGINT NOT NULL DEFAULT 0
)";

const SQL_GAME_INSERT: &str = "INSERT INTO games
    (app_id, name, singleplayer, multiplayer, online_multiplayer, local_multiplayer)
    VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT (app_id) DO NOTHING
    RETURNING id";

const SQL_GAME_EXISTS: &str = "SELECT COUNT(id) FROM games WHERE app_id = $1";

const SQL_GAME_UPDATE_PLAYERS: &str =
    "UPDATE games SET players = $1, last_update = $2 WHERE app_id = $3";

const SQL_GAMES_UNUPDATED: &str = "SELECT app_id FROM games WHERE last_update < $1";

const SQL_TOP_GAMES: &str = "SELECT id, app_id, name, singleplayer, multiplayer,
    online_multiplayer, local_multiplayer, last_update, players
    FROM games ORDER BY players DESC, name ASC LIMIT $1";

pub struct PostgresGames {
    pool: Pool,
}

impl PostgresGames {
    pub async fn connect(host: &DbHost) -> Result<Self> {
        let mut config = deadpool_postgres::Config::new();
        match host.host.split_once(':') {
            Some((name, port)) => {
                config.host = Some(name.to_string());
                config.port = port.parse().ok();
            }
            None => config.host = Some(host.host.clone()),
        }
        config.dbname = Some(host.dbname.clone());
        config.user = host.user.clone();
        config.password = host.password.clone();

        let pool = config.create_pool(Some(Runtime::Tokio1), NoTls)?;

        // Validates connectivity and applies the schema in one round trip.
        let client = pool.get().await?;
        client.execute(SQL_CREATE_GAMES_TABLE, &[]).await?;

        Ok(Self { pool })
    }

    pub async fn exists(&self, app_id: i64) -> Result<bool> {
        let client = self.pool.get().await?;
        let row = client.query_one(SQL_GAME_EXISTS, &[&app_id]).await?;
        let count: i64 = row.get(0);
        Ok(count > 0)
    }

    pub async fn save_app_info(
        &self,
        app_id: i64,
        name: &str,
        singleplayer: bool,
        multiplayer: bool,
        online_multiplayer: bool,
        local_multiplayer: bool,
    ) -> Result<Option<i64>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                SQL_GAME_INSERT,
                &[
                    &app_id,
                    &name,
                    &singleplayer,
                    &multiplayer,
                    &online_multiplayer,
                    &local_multiplayer,
                ],
            )
            .await?;
        Ok(row.map(|r| r.get(0)))
    }

    pub async fn unupdated_app_ids(&self, since: i64) -> Result<Vec<i64>> {
        let client = self.pool.get().await?;
        let rows = client.query(SQL_GAMES_UNUPDATED, &[&since]).await?;
        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    pub async fn update_players_count(&self, app_id: i64, players: i64) -> Result<()> {
        let client = self.pool.get().await?;
        let now = Utc::now().timestamp();
        client
            .execute(SQL_GAME_UPDATE_PLAYERS, &[&players, &now, &app_id])
            .await?;
        Ok(())
    }

    pub async fn top_games(&self, limit: i64) -> Result<Vec<Game>> {
        let client = self.pool.get().await?;
        let rows = client.query(SQL_TOP_GAMES, &[&limit]).await?;
        let games = rows
            .into_iter()
            .map(|row| Game {
                id: row.get(0),
                app_id: row.get(1),
                name: row.get(2),
                singleplayer: row.get(3),
                multiplayer: row.get(4),
                online_multiplayer: row.get(5),
                local_multiplayer: row.get(6),
                last_update: row.get(7),
                players: row.get(8),
            })
            .collect();
        Ok(games)
    }
}
