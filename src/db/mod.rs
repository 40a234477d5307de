//! The games store.
//!
//! One table, `games`, holding the latest known player count per
//! application. Two engines are supported: a local SQLite file (writes
//! serialized through a mutex, since the embedded engine does not) and a
//! networked PostgreSQL server (which brings its own serialization).

mod postgres;
mod sqlite;

use crate::config::{DbConfig, DbKind};
use crate::error::Result;

/// One persisted row per application.
#[derive(Debug, Clone)]
pub struct Game {
    pub id: i64,
    pub app_id: i64,
    pub name: String,
    pub singleplayer: bool,
    pub multiplayer: bool,
    pub online_multiplayer: bool,
    pub local_multiplayer: bool,
    /// Epoch seconds of the last successful player-count refresh; 0 means
    /// never refreshed and therefore immediately stale.
    pub last_update: i64,
    pub players: i64,
}

pub enum GamesDb {
    Sqlite(sqlite::SqliteGames),
    Postgres(postgres::PostgresGames),
}

impl GamesDb {
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        match config.database.kind {
            DbKind::Sqlite3 => Ok(Self::Sqlite(sqlite::SqliteGames::open(
                &config.database.host,
            )?)),
            DbKind::Postgres => Ok(Self::Postgres(
                postgres::PostgresGames::connect(&config.database).await?,
            )),
        }
    }

    /// True iff at least one row carries `app_id`.
    pub async fn exists(&self, app_id: i64) -> Result<bool> {
        match self {
            Self::Sqlite(db) => db.exists(app_id).await,
            Self::Postgres(db) => db.exists(app_id).await,
        }
    }

    /// Insert a newly discovered application with `players = 0` and
    /// `last_update = 0`. Returns the new row id, or `None` when a row for
    /// `app_id` already exists (the insert is conflict-ignoring, so the
    /// probe-then-insert window cannot produce duplicate rows).
    pub async fn save_app_info(
        &self,
        app_id: i64,
        name: &str,
        singleplayer: bool,
        multiplayer: bool,
        online_multiplayer: bool,
        local_multiplayer: bool,
    ) -> Result<Option<i64>> {
        match self {
            Self::Sqlite(db) => {
                db.save_app_info(
                    app_id,
                    name,
                    singleplayer,
                    multiplayer,
                    online_multiplayer,
                    local_multiplayer,
                )
                .await
            }
            Self::Postgres(db) => {
                db.save_app_info(
                    app_id,
                    name,
                    singleplayer,
                    multiplayer,
                    online_multiplayer,
                    local_multiplayer,
                )
                .await
            }
        }
    }

    /// All app ids with `last_update < since` (epoch seconds), in storage
    /// order.
    pub async fn unupdated_app_ids(&self, since: i64) -> Result<Vec<i64>> {
        match self {
            Self::Sqlite(db) => db.unupdated_app_ids(since).await,
            Self::Postgres(db) => db.unupdated_app_ids(since).await,
        }
    }

    /// Set `(players, last_update = now)` on every row matching `app_id`.
    /// Matching zero rows is not an error.
    pub async fn update_players_count(&self, app_id: i64, players: i64) -> Result<()> {
        match self {
            Self::Sqlite(db) => db.update_players_count(app_id, players).await,
            Self::Postgres(db) => db.update_players_count(app_id, players).await,
        }
    }

    /// At most `limit` rows ordered by `players DESC, name ASC`.
    pub async fn top_games(&self, limit: i64) -> Result<Vec<Game>> {
        match self {
            Self::Sqlite(db) => db.top_games(limit).await,
            Self::Postgres(db) => db.top_games(limit).await,
        }
    }
}
