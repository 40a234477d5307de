//! Player-count refresh for rows whose last update is older than a caller's
//! staleness window.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::client::Client;
use crate::db::GamesDb;
use crate::error::Result;
use crate::run::{RunToken, StopCause};
use crate::steam;

pub struct Updater {
    db: Arc<GamesDb>,
    client: Client,
    api_base: String,
    workers: usize,
}

impl Updater {
    pub fn new(db: Arc<GamesDb>, workers: usize) -> Result<Self> {
        Self::with_api_base(db, workers, steam::API_BASE_URL)
    }

    fn with_api_base(db: Arc<GamesDb>, workers: usize, api_base: &str) -> Result<Self> {
        Ok(Self {
            db,
            client: Client::new()?,
            api_base: api_base.to_string(),
            workers: workers.max(1),
        })
    }

    /// Refresh every row whose `last_update` is older than `now - staleness`.
    /// Unlike the scraper, any fetch failure here is fatal for the run.
    pub async fn update(&self, staleness: Duration) -> Result<()> {
        let since = Utc::now().timestamp() - staleness.as_secs() as i64;
        let stale_ids = self.db.unupdated_app_ids(since).await?;

        let run = Arc::new(RunToken::new());
        let pool = Arc::new(Semaphore::new(self.workers));
        let mut workers = JoinSet::new();
        for app_id in stale_ids {
            let Ok(permit) = pool.clone().acquire_owned().await else {
                break;
            };
            let db = self.db.clone();
            let client = self.client.clone();
            let api_base = self.api_base.clone();
            let run = run.clone();
            workers.spawn(async move {
                let _permit = permit;
                refresh_app(db, client, api_base, run, app_id).await;
            });
        }

        while workers.join_next().await.is_some() {}
        run.result()
    }
}

async fn refresh_app(
    db: Arc<GamesDb>,
    client: Client,
    api_base: String,
    run: Arc<RunToken>,
    app_id: i64,
) {
    if run.is_cancelled() {
        return;
    }
    let url = steam::player_count_url(&api_base, app_id);
    let players: steam::PlayerCount = match client.fetch_json(&url).await {
        Ok(players) => players,
        Err(err) => {
            run.cancel(StopCause::Failed(err));
            return;
        }
    };
    let count = players.response.player_count;
    if let Err(err) = db.update_players_count(app_id, count).await {
        run.cancel(StopCause::Failed(err));
        return;
    }
    tracing::info!(app_id, players = count, "updated player count");
}
