use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{require, Config};
use crate::error::{AppError, Result};
use crate::models::{CatalogTrack, TrackId};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<Paging<TrackObject>>,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    id: Option<String>,
    album: Option<Album>,
}

#[derive(Debug, Deserialize)]
struct Album {
    #[serde(default)]
    release_date: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<TrackObject>,
}

#[derive(Debug, Serialize)]
struct AddTracksRequest {
    uris: Vec<String>,
    position: usize,
}

/// The parts of the streaming catalog the playlist job talks to.
#[async_trait]
pub trait MusicCatalog: Send + Sync {
    /// Best match for `query`, if the catalog returned anything.
    async fn search_top_track(&self, query: &str) -> Result<Option<CatalogTrack>>;

    /// Track ids on the first page of the playlist.
    async fn playlist_track_ids(&self, playlist_id: &str) -> Result<Vec<TrackId>>;

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[TrackId], position: usize) -> Result<()>;
}

pub struct SpotifyClient {
    client: Client,
    api_url: String,
    access_token: String,
}

impl SpotifyClient {
    /// Trade the stored refresh token for a user access token.
    pub async fn authenticate(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let client_id = require("spotify_client_id", &config.spotify_client_id)?;
        let client_secret = require("spotify_client_secret", &config.spotify_client_secret)?;
        let refresh_token = require("spotify_refresh_token", &config.spotify_refresh_token)?;

        let response = client
            .post(format!(
                "{}/api/token",
                config.spotify_accounts_url.trim_end_matches('/')
            ))
            .basic_auth(client_id, Some(client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!(
                "spotify token refresh returned {}: {}",
                status, error_text
            )));
        }

        let token: TokenResponse = response.json().await?;
        let access_token = token
            .access_token
            .ok_or_else(|| AppError::Auth("spotify token response has no access_token".to_string()))?;

        Ok(Self {
            client,
            api_url: config.spotify_api_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    fn playlist_tracks_url(&self, playlist_id: &str) -> String {
        format!(
            "{}/v1/playlists/{}/tracks",
            self.api_url,
            urlencoding::encode(playlist_id)
        )
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        Err(AppError::MusicApi(format!("{} returned {}: {}", what, status, error_text)))
    }
}

#[async_trait]
impl MusicCatalog for SpotifyClient {
    async fn search_top_track(&self, query: &str) -> Result<Option<CatalogTrack>> {
        let response = self
            .client
            .get(format!("{}/v1/search", self.api_url))
            .bearer_auth(&self.access_token)
            .query(&[("q", query), ("type", "track"), ("limit", "10")])
            .send()
            .await?;
        let response = Self::check(response, "search").await?;

        let search: SearchResponse = response.json().await?;
        Ok(top_track(search))
    }

    async fn playlist_track_ids(&self, playlist_id: &str) -> Result<Vec<TrackId>> {
        let response = self
            .client
            .get(self.playlist_tracks_url(playlist_id))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let response = Self::check(response, "playlist read").await?;

        let page: Paging<PlaylistItem> = response.json().await?;
        Ok(playlist_ids(page))
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[TrackId], position: usize) -> Result<()> {
        let request = AddTracksRequest {
            uris: track_ids.iter().map(|id| track_uri(id)).collect(),
            position,
        };

        let response = self
            .client
            .post(self.playlist_tracks_url(playlist_id))
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;
        Self::check(response, "playlist add").await?;
        Ok(())
    }
}

fn track_uri(id: &str) -> String {
    if id.starts_with("spotify:track:") {
        id.to_string()
    } else {
        format!("spotify:track:{}", id)
    }
}

fn top_track(search: SearchResponse) -> Option<CatalogTrack> {
    let track = search.tracks?.items.into_iter().next()?;
    Some(CatalogTrack {
        id: track.id?,
        release_date: track.album.map(|a| a.release_date).unwrap_or_default(),
    })
}

// Local files and removed tracks come back as null or id-less entries
fn playlist_ids(page: Paging<PlaylistItem>) -> Vec<TrackId> {
    page.items
        .into_iter()
        .filter_map(|item| item.track.and_then(|t| t.id))
        .collect()
}
