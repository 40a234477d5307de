//! Catalog discovery: walk the storefront search pages and persist newly
//! sighted applications.
//!
//! A single producer task walks pages 1, 2, 3, … and feeds extracted app ids
//! into an unbounded channel; the main loop hands each id to a worker task,
//! with concurrency capped by a semaphore so a page full of ids cannot turn
//! into a thundering herd of outbound requests.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::client::Client;
use crate::db::GamesDb;
use crate::error::{Error, Result};
use crate::run::{RunToken, StopCause};
use crate::steam;

pub const DEFAULT_WORKERS: usize = 8;

pub struct Scraper {
    db: Arc<GamesDb>,
    client: Client,
    store_base: String,
    workers: usize,
}

impl Scraper {
    pub fn new(db: Arc<GamesDb>, workers: usize) -> Result<Self> {
        Self::with_store_base(db, workers, steam::STORE_BASE_URL)
    }

    fn with_store_base(db: Arc<GamesDb>, workers: usize, store_base: &str) -> Result<Self> {
        Ok(Self {
            db,
            client: Client::new()?,
            store_base: store_base.to_string(),
            workers: workers.max(1),
        })
    }

    /// Run one discovery pass. With `continue_on_duplicate` unset, hitting
    /// an already-known app ends the run gracefully; a full scrape skips
    /// duplicates and keeps walking until a page yields nothing.
    pub async fn scrape(&self, continue_on_duplicate: bool) -> Result<()> {
        let run = Arc::new(RunToken::new());
        let (ids_tx, mut ids_rx) = mpsc::unbounded_channel();

        let producer = tokio::spawn(walk_pages(
            self.client.clone(),
            self.store_base.clone(),
            run.clone(),
            ids_tx,
        ));

        let pool = Arc::new(Semaphore::new(self.workers));
        let mut workers = JoinSet::new();
        while let Some(app_id) = ids_rx.recv().await {
            if run.is_cancelled() {
                break;
            }
            let Ok(permit) = pool.clone().acquire_owned().await else {
                break;
            };
            let db = self.db.clone();
            let client = self.client.clone();
            let store_base = self.store_base.clone();
            let run = run.clone();
            workers.spawn(async move {
                let _permit = permit;
                persist_app(db, client, store_base, run, app_id, continue_on_duplicate).await;
            });
        }
        drop(ids_rx);

        while workers.join_next().await.is_some() {}
        let _ = producer.await;
        run.result()
    }
}

/// Producer side: fetch search pages until one yields no ids or the run is
/// cancelled. Dropping the sender closes the channel and ends the consumer
/// loop.
async fn walk_pages(
    client: Client,
    store_base: String,
    run: Arc<RunToken>,
    ids: mpsc::UnboundedSender<i64>,
) {
    for page in 1u32.. {
        if run.is_cancelled() {
            return;
        }
        let url = steam::search_page_url(&store_base, page);
        let html = match client.fetch_text(&url).await {
            Ok(html) => html,
            Err(err) => {
                run.cancel(StopCause::Failed(err));
                return;
            }
        };
        let batch = steam::extract_app_ids(&html);
        if batch.is_empty() {
            return;
        }
        for app_id in batch {
            if ids.send(app_id).is_err() {
                return;
            }
        }
    }
}

async fn persist_app(
    db: Arc<GamesDb>,
    client: Client,
    store_base: String,
    run: Arc<RunToken>,
    app_id: i64,
    continue_on_duplicate: bool,
) {
    if run.is_cancelled() {
        return;
    }
    let exists = match db.exists(app_id).await {
        Ok(exists) => exists,
        Err(err) => {
            run.cancel(StopCause::Failed(err));
            return;
        }
    };
    if exists {
        if !continue_on_duplicate {
            run.cancel(StopCause::Finished);
        }
        return;
    }

    let url = steam::app_details_url(&store_base, app_id);
    let envelope: Option<steam::AppInfoById> = match client.fetch_json(&url).await {
        Ok(envelope) => envelope,
        Err(err) => {
            // Per-app fetch and decode failures only cost us this id.
            tracing::warn!(app_id, error = %err, "skipping app info");
            return;
        }
    };
    let envelope = envelope.unwrap_or_default();
    if envelope.is_empty() {
        run.cancel(StopCause::Failed(Error::RateLimited { app_id }));
        return;
    }
    let Some(info) = envelope.get(&app_id.to_string()) else {
        run.cancel(StopCause::Failed(Error::UnexpectedPayload { app_id }));
        return;
    };

    match db
        .save_app_info(
            app_id,
            &info.data.name,
            info.is_singleplayer(),
            info.is_multiplayer(),
            info.is_online_multiplayer(),
            info.is_local_multiplayer(),
        )
        .await
    {
        Ok(Some(row_id)) => {
            tracing::info!(app_id, name = %info.data.name, row_id, "saved game")
        }
        Ok(None) => tracing::debug!(app_id, "game appeared concurrently, skipped"),
        Err(err) => run.cancel(StopCause::Failed(err)),
    }
}
