mod config;
mod db;
mod error;
mod feed;
mod jobs;
mod models;
mod services;
#[cfg(test)]
mod test_support;

use config::Config;
use db::Repository;
use error::{AppError, Result};
use feed::FeedlyClient;
use jobs::{FeedToPlaylistJob, FeedToStoreJob, PlaylistSettings};
use services::{ContentFetcher, SpotifyClient};

const USAGE: &str = "usage: feed-etl --store | --playlist";

#[tokio::main]
async fn main() -> Result<()> {
    // Progress lines are the only output, so default to info for this crate
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("feed_etl=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let job = args.get(1).map(String::as_str);

    match job {
        Some("--store") => {
            let config = Config::load()?;
            config.validate_for_store()?;
            run_store_job(&config).await
        }
        Some("--playlist") => {
            let config = Config::load()?;
            config.validate_for_playlist()?;
            run_playlist_job(&config).await
        }
        _ => {
            eprintln!("{}", USAGE);
            Err(AppError::Config(format!(
                "unknown job {:?}",
                job.unwrap_or_default()
            )))
        }
    }
}

async fn run_store_job(config: &Config) -> Result<()> {
    let feed = FeedlyClient::authenticate(config).await?;
    let scraper = ContentFetcher::new()?;
    let store = Repository::new(&config.db_path).await?;

    let report = FeedToStoreJob::new(&feed, &scraper, &store).run().await?;

    tracing::info!(
        "stored {} new entries from {} pages ({} without page content), {} total",
        report.added.len(),
        report.pages_fetched,
        report.scrape_failures,
        store.count_entries().await?
    );
    if let Some(id) = report.caught_up_at {
        tracing::info!("caught up with previous run at {}", id);
    }
    Ok(())
}

async fn run_playlist_job(config: &Config) -> Result<()> {
    let feed = FeedlyClient::authenticate(config).await?;
    let catalog = SpotifyClient::authenticate(config).await?;

    let settings = PlaylistSettings {
        playlist_id: config::require("spotify_playlist_id", &config.spotify_playlist_id)?
            .to_string(),
        category: config.music_category.clone(),
        stop_words: config.stop_words.clone(),
    };

    let report = FeedToPlaylistJob::new(&feed, &catalog, settings).run().await?;

    tracing::info!(
        "{} titles, {} recent releases, {} added",
        report.titles,
        report.recent_tracks.len(),
        report.added.len()
    );
    Ok(())
}
