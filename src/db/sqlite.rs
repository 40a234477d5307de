//! SQLite engine for the games store.
//!
//! SQLite does not serialize concurrent writers, so every operation takes
//! the connection mutex. Results are materialized before the lock is
//! released; readers never hold it across awaits.

use chrono::Utc;
use rusqlite::{params, Connection};
use tokio::sync::Mutex;

use super::Game;
use crate::error::Result;

const SQL_CREATE_GAMES_TABLE: &str = "CREATE TABLE IF NOT EXISTS games (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    app_id INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL,
    singleplayer INTEGER DEFAULT 0 NOT NULL,
    multiplayer INTEGER DEFAULT 0 NOT NULL,
    online_multiplayer INTEGER DEFAULT 0 NOT NULL,
    local_multiplayer INTEGER DEFAULT 0 NOT NULL,
    last_update INTEGER DEFAULT 0 NOT NULL,
    players INTEGER DEFAULT 0 NOT NULL
)";

const SQL_GAME_INSERT: &str = "INSERT INTO games
    (app_id, name, singleplayer, multiplayer, online_multiplayer, local_multiplayer)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(app_id) DO NOTHING";

const SQL_GAME_EXISTS: &str = "SELECT COUNT(id) FROM games WHERE app_id = ?1";

const SQL_GAME_UPDATE_PLAYERS: &str =
    "UPDATE games SET players = ?1, last_update = ?2 WHERE app_id = ?3";

const SQL_GAMES_UNUPDATED: &str = "SELECT app_id FROM games WHERE last_update < ?1";

const SQL_TOP_GAMES: &str = "SELECT id, app_id, name, singleplayer, multiplayer,
    online_multiplayer, local_multiplayer, last_update, players
    FROM games ORDER BY players DESC, name ASC LIMIT ?1";

pub struct SqliteGames {
    conn: Mutex<Connection>,
}

impl SqliteGames {
    /// Open (or create) the database file and apply the schema.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute(SQL_CREATE_GAMES_TABLE, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub async fn exists(&self, app_id: i64) -> Result<bool> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(SQL_GAME_EXISTS, params![app_id], |row| row.get(0))?;
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
        let conn = self.conn.lock().await;
        let inserted = conn.execute(
            SQL_GAME_INSERT,
            params![
                app_id,
                name,
                singleplayer,
                multiplayer,
                online_multiplayer,
                local_multiplayer
            ],
        )?;
        if inserted == 0 {
            Ok(None)
        } else {
            Ok(Some(conn.last_insert_rowid()))
        }
    }

    pub async fn unupdated_app_ids(&self, since: i64) -> Result<Vec<i64>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(SQL_GAMES_UNUPDATED)?;
        let ids = stmt
            .query_map(params![since], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    pub async fn update_players_count(&self, app_id: i64, players: i64) -> Result<()> {
        let conn = self.conn.lock().await;
        let now = Utc::now().timestamp();
        conn.execute(SQL_GAME_UPDATE_PLAYERS, params![players, now, app_id])?;
        Ok(())
    }

    pub async fn top_games(&self, limit: i64) -> Result<Vec<Game>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(SQL_TOP_GAMES)?;
        let games = stmt
            .query_map(params![limit], |row| {
                Ok(Game {
                    id: row.get(0)?,
                    app_id: row.get(1)?,
                    name: row.get(2)?,
                    singleplayer: row.get(3)?,
                    multiplayer: row.get(4)?,
                    online_multiplayer: row.get(5)?,
                    local_multiplayer: row.get(6)?,
                    last_update: row.get(7)?,
                    players: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(games)
    }
}
