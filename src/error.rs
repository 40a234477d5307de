//! Error types shared across the crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("bad response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("empty appdetails payload for app {app_id}, probably rate limited")]
    RateLimited { app_id: i64 },

    #[error("unexpected appdetails payload for app {app_id}")]
    UnexpectedPayload { app_id: i64 },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("failed to set up connection pool: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
