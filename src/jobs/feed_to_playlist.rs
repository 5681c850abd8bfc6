use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{Local, NaiveDateTime};
use regex::Regex;

use crate::error::Result;
use crate::feed::{FeedSource, StreamQuery};
use crate::models::TrackId;
use crate::services::MusicCatalog;

const TITLES_FETCHED: usize = 100;
const TITLES_KEPT: usize = 30;
const RELEASE_WINDOW_DAYS: i64 = 7;

static TERM_RE: OnceLock<Regex> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct PlaylistSettings {
    pub playlist_id: String,
    pub category: String,
    pub stop_words: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlaylistReport {
    pub titles: usize,
    pub recent_tracks: Vec<TrackId>,
    pub added: Vec<TrackId>,
}

/// Finds fresh releases for recently seen music headlines and puts them at
/// the top of a playlist.
pub struct FeedToPlaylistJob<'a> {
    feed: &'a dyn FeedSource,
    catalog: &'a dyn MusicCatalog,
    settings: PlaylistSettings,
}

impl<'a> FeedToPlaylistJob<'a> {
    pub fn new(
        feed: &'a dyn FeedSource,
        catalog: &'a dyn MusicCatalog,
        settings: PlaylistSettings,
    ) -> Self {
        Self {
            feed,
            catalog,
            settings,
        }
    }

    pub async fn run(&self) -> Result<PlaylistReport> {
        self.run_at(Local::now().naive_local()).await
    }

    pub async fn run_at(&self, now: NaiveDateTime) -> Result<PlaylistReport> {
        let titles = self.recent_titles().await?;
        let recent_tracks = self.find_recent_tracks(&titles, now).await?;

        let current = self
            .catalog
            .playlist_track_ids(&self.settings.playlist_id)
            .await?;
        let to_add = tracks_to_add(&recent_tracks, &current);

        if to_add.is_empty() {
            tracing::info!("no new tracks for playlist {}", self.settings.playlist_id);
        } else {
            tracing::info!(
                "adding {} tracks to playlist {}",
                to_add.len(),
                self.settings.playlist_id
            );
            self.catalog
                .add_tracks(&self.settings.playlist_id, &to_add, 0)
                .await?;
        }
        tracing::info!("finished");

        Ok(PlaylistReport {
            titles: titles.len(),
            recent_tracks,
            added: to_add,
        })
    }

    async fn recent_titles(&self) -> Result<Vec<String>> {
        let query = StreamQuery {
            count: TITLES_FETCHED,
            unread_only: Some(false),
            ..StreamQuery::default()
        };
        let page = self
            .feed
            .fetch_category(&self.settings.category, query)
            .await?;

        Ok(page
            .items
            .into_iter()
            .filter_map(|item| item.title)
            .filter(|title| !title.is_empty())
            .take(TITLES_KEPT)
            .collect())
    }

    async fn find_recent_tracks(&self, titles: &[String], now: NaiveDateTime) -> Result<Vec<TrackId>> {
        let mut tracks = Vec::new();

        for title in titles {
            let query = derive_query(title, &self.settings.stop_words);
            tracing::info!("searching: {}", query);

            let Some(track) = self.catalog.search_top_track(&query).await? else {
                continue;
            };

            if track.parsed_release_date().is_none() {
                tracing::debug!("skipping {}: release date {:?}", track.id, track.release_date);
                continue;
            }
            if !track.released_within(now, RELEASE_WINDOW_DAYS) {
                tracing::debug!("skipping {}: released {}", track.id, track.release_date);
                continue;
            }

            tracks.push(track.id);
        }

        Ok(tracks)
    }
}

/// Build a catalog search query from a headline: keep runs of ASCII letters
/// and spaces, then drop stop words (whole tokens, case-sensitive).
pub fn derive_query(title: &str, stop_words: &[String]) -> String {
    let re = TERM_RE.get_or_init(|| Regex::new(r"[a-zA-Z ]+").expect("valid term pattern"));

    re.find_iter(title)
        .flat_map(|m| m.as_str().split_whitespace())
        .filter(|token| !stop_words.iter().any(|stop| stop == token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Candidates not already on the playlist, in discovery order. Only the
/// playlist is diffed against; a track found by two titles is added twice.
pub fn tracks_to_add(candidates: &[TrackId], current: &[TrackId]) -> Vec<TrackId> {
    let current: HashSet<&str> = current.iter().map(String::as_str).collect();

    candidates
        .iter()
        .filter(|id| !current.contains(id.as_str()))
        .cloned()
        .collect()
}
