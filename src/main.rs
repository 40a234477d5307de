//! steamdb tracks concurrent player counts for Steam games.
//!
//! One binary, four modes: scrape the catalog for new games, refresh stale
//! player counts, list the top games, or run the whole thing as a periodic
//! web service.

mod client;
mod config;
mod db;
mod error;
mod list;
mod run;
mod scraper;
mod server;
mod steam;
mod updater;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::db::GamesDb;
use crate::error::Result;

#[derive(Debug, Parser)]
#[command(name = "steamdb", version, about = "Track concurrent player counts for Steam games")]
struct Cli {
    /// Scrape the latest list of games
    #[arg(long)]
    scrape: bool,

    /// Scrape and do not stop on duplicates
    #[arg(long)]
    fullscrape: bool,

    /// Update games not refreshed within the last N minutes (-1 disables)
    #[arg(long, default_value_t = -1, value_name = "MINUTES", allow_negative_numbers = true)]
    update: i64,

    /// List the top N games
    #[arg(long, default_value_t = 0, value_name = "N")]
    list: i64,

    /// Run as a web service
    #[arg(long)]
    serve: bool,

    /// Update stats every N minutes while serving
    #[arg(long = "update-period", default_value_t = 5, value_name = "MINUTES")]
    update_period: u64,

    /// Scrape for new games every N minutes while serving
    #[arg(long = "games-period", default_value_t = 60, value_name = "MINUTES")]
    games_period: u64,

    /// Server bind address
    #[arg(long, default_value = "0.0.0.0:9654", value_name = "HOST:PORT")]
    port: String,

    /// Database configuration file (TOML)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Local SQLite database file
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Concurrent fetch workers per run
    #[arg(long, default_value_t = scraper::DEFAULT_WORKERS, value_name = "N")]
    workers: usize,
}

impl Cli {
    fn has_action(&self) -> bool {
        self.serve || self.scrape || self.fullscrape || self.update >= 0 || self.list >= 1
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "steamdb=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    if !cli.has_action() {
        let _ = Cli::command().print_help();
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let db_config = config::resolve(cli.config.as_deref(), cli.database.clone())?;
    let db = Arc::new(GamesDb::connect(&db_config).await?);

    if cli.serve {
        return server::run(
            db,
            server::ServeOptions {
                addr: cli.port.clone(),
                update_period: Duration::from_secs(cli.update_period * 60),
                games_period: Duration::from_secs(cli.games_period * 60),
                workers: cli.workers,
            },
        )
        .await;
    }

    if cli.scrape || cli.fullscrape {
        scraper::Scraper::new(db.clone(), cli.workers)?
            .scrape(cli.fullscrape)
            .await?;
    }
    if cli.update >= 0 {
        updater::Updater::new(db.clone(), cli.workers)?
            .update(Duration::from_secs(cli.update as u64 * 60))
            .await?;
    }
    if cli.list > 0 {
        list::Lister::new(db).list(cli.list).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_least_one_action_flag_is_required() {
        let cli = Cli::parse_from(["steamdb"]);
        assert!(!cli.has_action());

        for args in [
            vec!["steamdb", "--scrape"],
            vec!["steamdb", "--fullscrape"],
            vec!["steamdb", "--update", "30"],
            vec!["steamdb", "--list", "10"],
            vec!["steamdb", "--serve"],
        ] {
            assert!(Cli::parse_from(args).has_action());
        }
    }

    #[test]
    fn update_zero_is_an_action_but_disabled_is_not() {
        assert!(Cli::parse_from(["steamdb", "--update", "0"]).has_action());
        assert!(!Cli::parse_from(["steamdb", "--update", "-1"]).has_action());
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::parse_from(["steamdb", "--serve"]);
        assert_eq!(cli.update_period, 5);
        assert_eq!(cli.games_period, 60);
        assert_eq!(cli.port, "0.0.0.0:9654");
        assert_eq!(cli.workers, scraper::DEFAULT_WORKERS);
    }
}
