//! Database connection configuration.
//!
//! A `--config` file is TOML with a single `[database]` table. Without one,
//! the store falls back to a local SQLite file, by default under the user's
//! config directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

const DB_FILE_NAME: &str = "steam.db";

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub database: DbHost,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbHost {
    #[serde(rename = "type")]
    pub kind: DbKind,

    /// SQLite: path to the database file. Postgres: `host` or `host:port`.
    pub host: String,

    #[serde(default)]
    pub dbname: String,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DbKind {
    #[serde(rename = "sqlite3")]
    Sqlite3,
    #[serde(rename = "postgres")]
    Postgres,
}

/// Resolve the store descriptor from the command line: an explicit config
/// file wins, then an explicit SQLite path, then the default SQLite path.
pub fn resolve(config: Option<&Path>, database: Option<PathBuf>) -> Result<DbConfig> {
    match (config, database) {
        (Some(path), _) => load(path),
        (None, Some(path)) => Ok(sqlite_config(path)),
        (None, None) => Ok(sqlite_config(default_sqlite_path()?)),
    }
}

pub fn load(path: &Path) -> Result<DbConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
}

pub fn sqlite_config(path: PathBuf) -> DbConfig {
    DbConfig {
        database: DbHost {
            kind: DbKind::Sqlite3,
            host: path.to_string_lossy().into_owned(),
            dbname: "steam".to_string(),
            user: None,
            password: None,
        },
    }
}

/// `$HOME/.config/steamdb/steam.db`, creating the directory with mode 0700
/// if absent.
pub fn default_sqlite_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "steamdb")
        .ok_or_else(|| Error::Config("cannot determine home directory".to_string()))?;
    let dir = dirs.config_dir();
    if !dir.exists() {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder
            .create(dir)
            .map_err(|e| Error::Config(format!("cannot create {}: {}", dir.display(), e)))?;
    }
    Ok(dir.join(DB_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_postgres_config() {
        let config: DbConfig = toml::from_str(
            r#"
            [database]
            type = "postgres"
            host = "db.example.com:5432"
            dbname = "steam"
            user = "steam"
            password = "hunter2"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.kind, DbKind::Postgres);
        assert_eq!(config.database.host, "db.example.com:5432");
        assert_eq!(config.database.dbname, "steam");
        assert_eq!(config.database.user.as_deref(), Some("steam"));
    }

    #[test]
    fn parses_sqlite_config() {
        let config: DbConfig = toml::from_str(
            r#"
            [database]
            type = "sqlite3"
            host = "/tmp/steam.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.kind, DbKind::Sqlite3);
        assert_eq!(config.database.host, "/tmp/steam.db");
    }

    #[test]
    fn rejects_unknown_engine_type() {
        let parsed: std::result::Result<DbConfig, _> = toml::from_str(
            r#"
            [database]
            type = "mysql"
            host = "localhost"
            "#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn explicit_database_path_beats_default() {
        let config = resolve(None, Some(PathBuf::from("/tmp/other.db"))).unwrap();
        assert_eq!(config.database.kind, DbKind::Sqlite3);
        assert_eq!(config.database.host, "/tmp/other.db");
    }
}
