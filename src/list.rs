//! Terminal listing of the top games.

use std::sync::Arc;

use crate::db::GamesDb;
use crate::error::Result;

pub struct Lister {
    db: Arc<GamesDb>,
}

impl Lister {
    pub fn new(db: Arc<GamesDb>) -> Self {
        Self { db }
    }

    pub async fn list(&self, top: i64) -> Result<()> {
        let games = self.db.top_games(top).await?;
        for (i, game) in games.iter().enumerate() {
            println!(
                "{:3}: {:<6} {:<35} {}",
                i + 1,
                game.app_id,
                game.name,
                game.players
            );
        }
        Ok(())
    }
}
