//! Serve mode: periodic harvesters plus a JSON snapshot endpoint.
//!
//! Two timers drive the background work on a single task: a stats refresh
//! every `update_period` and a catalog scrape (plus snapshot rebuild) every
//! `games_period`. Handlers run serially, so a slow scrape delays the next
//! refresh rather than overlapping with it. HTTP readers only ever touch the
//! published snapshot.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::db::GamesDb;
use crate::error::Result;
use crate::scraper::Scraper;
use crate::updater::Updater;

/// Upper bound on the snapshot served at `/`.
const MAX_JSON_GAMES: i64 = 10_000;

/// The service only answers tiny GETs; anything bigger is rejected early.
const MAX_REQUEST_BYTES: usize = 128;

#[derive(Debug, Clone, Serialize)]
pub struct RankedGame {
    pub app_id: i64,
    pub name: String,
    pub players: i64,
    pub rank: usize,
}

/// Shared between the background task (sole writer) and the HTTP handlers.
/// The snapshot is swapped as one `Arc` store, so a reader sees either the
/// complete previous list or the complete new one.
pub struct AppState {
    games: RwLock<Arc<Vec<RankedGame>>>,
}

impl AppState {
    fn new() -> Self {
        Self {
            games: RwLock::new(Arc::new(Vec::new())),
        }
    }

    fn publish(&self, games: Vec<RankedGame>) {
        *self.games.write().unwrap() = Arc::new(games);
    }

    fn snapshot(&self) -> Arc<Vec<RankedGame>> {
        self.games.read().unwrap().clone()
    }
}

pub struct ServeOptions {
    pub addr: String,
    pub update_period: Duration,
    pub games_period: Duration,
    pub workers: usize,
}

pub async fn run(db: Arc<GamesDb>, options: ServeOptions) -> Result<()> {
    let state = Arc::new(AppState::new());

    // Serve whatever the store already holds while the first scrape runs.
    if let Err(err) = rebuild_snapshot(&db, &state).await {
        tracing::error!(error = %err, "error building games list");
    }

    let cancel = CancellationToken::new();
    let background = tokio::spawn(background_loop(
        db,
        state.clone(),
        options.update_period,
        options.games_period,
        options.workers,
        cancel.clone(),
    ));

    let app = router(state);

    tracing::info!(addr = %options.addr, "serving");
    let listener = tokio::net::TcpListener::bind(&options.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    let _ = background.await;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(games_view))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .layer(CompressionLayer::new())
}

async fn games_view(State(state): State<Arc<AppState>>) -> Json<Vec<RankedGame>> {
    Json(state.snapshot().as_ref().clone())
}

async fn shutdown_signal(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown signal received");
    }
    cancel.cancel();
}

async fn background_loop(
    db: Arc<GamesDb>,
    state: Arc<AppState>,
    update_period: Duration,
    games_period: Duration,
    workers: usize,
    cancel: CancellationToken,
) {
    let (scraper, updater) = match (
        Scraper::new(db.clone(), workers),
        Updater::new(db.clone(), workers),
    ) {
        (Ok(scraper), Ok(updater)) => (scraper, updater),
        (Err(err), _) | (_, Err(err)) => {
            tracing::error!(error = %err, "cannot start background tasks");
            return;
        }
    };

    // One refresh up front; the tickers take over from there.
    refresh_stats(&updater, update_period).await;

    let start = tokio::time::Instant::now();
    let mut update_tick = tokio::time::interval_at(start + update_period, update_period);
    let mut games_tick = tokio::time::interval_at(start + games_period, games_period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("background tasks stopping");
                return;
            }
            _ = update_tick.tick() => {
                refresh_stats(&updater, update_period).await;
            }
            _ = games_tick.tick() => {
                tracing::info!("scraping games");
                if let Err(err) = scraper.scrape(true).await {
                    tracing::error!(error = %err, "error scraping");
                }
                if let Err(err) = rebuild_snapshot(&db, &state).await {
                    tracing::error!(error = %err, "error building games list");
                }
            }
        }
    }
}

/// The staleness window is the refresh period itself: rows untouched for a
/// full period are due again.
async fn refresh_stats(updater: &Updater, update_period: Duration) {
    tracing::info!("updating player counts");
    if let Err(err) = updater.update(update_period).await {
        tracing::error!(error = %err, "error updating");
    }
}

async fn rebuild_snapshot(db: &GamesDb, state: &AppState) -> Result<()> {
    let games = db.top_games(MAX_JSON_GAMES).await?;
    let ranked = games
        .into_iter()
        .enumerate()
        .map(|(i, game)| RankedGame {
            app_id: game.app_id,
            name: game.name,
            players: game.players,
            rank: i + 1,
        })
        .collect();
    state.publish(ranked);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use std::path::PathBuf;

    async fn memory_db() -> Arc<GamesDb> {
        let config = config::sqlite_config(PathBuf::from(":memory:"));
        Arc::new(GamesDb::connect(&config).await.unwrap())
    }

    #[tokio::test]
    async fn snapshot_ranks_are_contiguous_and_ordered() {
        let db = memory_db().await;
        for (app_id, name, players) in [(1, "Zeta", 10), (2, "Alpha", 10), (3, "Beta", 7)] {
            db.save_app_info(app_id, name, true, false, false, false)
                .await
                .unwrap();
            db.update_players_count(app_id, players).await.unwrap();
        }

        let state = Arc::new(AppState::new());
        rebuild_snapshot(&db, &state).await.unwrap();

        let snapshot = state.snapshot();
        let ranks: Vec<usize> = snapshot.iter().map(|g| g.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        let names: Vec<&str> = snapshot.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta", "Beta"]);
    }

    #[tokio::test]
    async fn publishing_replaces_the_whole_snapshot() {
        let state = AppState::new();
        assert!(state.snapshot().is_empty());

        state.publish(vec![RankedGame {
            app_id: 620,
            name: "Portal 2".to_string(),
            players: 4242,
            rank: 1,
        }]);
        let first = state.snapshot();

        state.publish(Vec::new());
        // A reader that grabbed the old snapshot still sees it whole.
        assert_eq!(first.len(), 1);
        assert!(state.snapshot().is_empty());
    }

    #[tokio::test]
    async fn games_view_serves_the_current_snapshot() {
        let state = Arc::new(AppState::new());
        state.publish(vec![
            RankedGame {
                app_id: 570,
                name: "Dota 2".to_string(),
                players: 400_000,
                rank: 1,
            },
            RankedGame {
                app_id: 730,
                name: "CS2".to_string(),
                players: 300_000,
                rank: 2,
            },
        ]);

        let Json(games) = games_view(State(state)).await;
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].app_id, 570);
        assert_eq!(games[1].rank, 2);

        let body = serde_json::to_value(&games).unwrap();
        assert_eq!(body[0]["name"], "Dota 2");
        assert_eq!(body[1]["players"], 300_000);
    }
}
