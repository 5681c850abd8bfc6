use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use url::Url;

use crate::error::{AppError, Result};

const APP_DIR: &str = "feed-etl";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_feedly_base_url")]
    pub feedly_base_url: String,
    pub feedly_refresh_token: Option<String>,
    #[serde(default = "default_feedly_client")]
    pub feedly_client_id: String,
    #[serde(default = "default_feedly_client")]
    pub feedly_client_secret: String,

    #[serde(default = "default_spotify_api_url")]
    pub spotify_api_url: String,
    #[serde(default = "default_spotify_accounts_url")]
    pub spotify_accounts_url: String,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub spotify_refresh_token: Option<String>,
    pub spotify_playlist_id: Option<String>,

    #[serde(default = "default_music_category")]
    pub music_category: String,

    #[serde(default = "default_stop_words")]
    pub stop_words: Vec<String>,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("store.db").to_string_lossy().to_string()
}

fn default_feedly_base_url() -> String {
    "https://cloud.feedly.com".to_string()
}

fn default_feedly_client() -> String {
    "feedlydev".to_string()
}

fn default_spotify_api_url() -> String {
    "https://api.spotify.com".to_string()
}

fn default_spotify_accounts_url() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_music_category() -> String {
    "Music".to_string()
}

fn default_stop_words() -> Vec<String> {
    vec!["MV".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            feedly_base_url: default_feedly_base_url(),
            feedly_refresh_token: None,
            feedly_client_id: default_feedly_client(),
            feedly_client_secret: default_feedly_client(),
            spotify_api_url: default_spotify_api_url(),
            spotify_accounts_url: default_spotify_accounts_url(),
            spotify_client_id: None,
            spotify_client_secret: None,
            spotify_refresh_token: None,
            spotify_playlist_id: None,
            music_category: default_music_category(),
            stop_words: default_stop_words(),
        }
    }
}

impl Config {
    /// Load the config file (creating it on first run), then apply
    /// credentials from the environment and `~/.env`.
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            // A missing ~/.env is fine, credentials may come from the real environment
            dotenvy::from_path(home.join(".env")).ok();
        }

        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = lookup("FEEDLY_REFRESH_TOKEN") {
            self.feedly_refresh_token = Some(v);
        }
        if let Some(v) = lookup("SPOTIPY_CLIENT_ID") {
            self.spotify_client_id = Some(v);
        }
        if let Some(v) = lookup("SPOTIPY_CLIENT_SECRET") {
            self.spotify_client_secret = Some(v);
        }
        if let Some(v) = lookup("SPOTIFY_REFRESH_TOKEN") {
            self.spotify_refresh_token = Some(v);
        }
        if let Some(v) = lookup("SPOTIFY_PLAYLIST_ID") {
            self.spotify_playlist_id = Some(v);
        }
        if let Some(v) = lookup("FEED_ETL_DB_PATH") {
            self.db_path = v;
        }
    }

    /// Check everything the feed-to-store job needs before touching the network.
    pub fn validate_for_store(&self) -> Result<()> {
        require("feedly_refresh_token", &self.feedly_refresh_token)?;
        check_url("feedly_base_url", &self.feedly_base_url)?;
        if self.db_path.trim().is_empty() {
            return Err(AppError::Config("db_path is empty".to_string()));
        }
        Ok(())
    }

    /// Check everything the feed-to-playlist job needs before touching the network.
    pub fn validate_for_playlist(&self) -> Result<()> {
        require("feedly_refresh_token", &self.feedly_refresh_token)?;
        require("spotify_client_id", &self.spotify_client_id)?;
        require("spotify_client_secret", &self.spotify_client_secret)?;
        require("spotify_refresh_token", &self.spotify_refresh_token)?;
        require("spotify_playlist_id", &self.spotify_playlist_id)?;
        check_url("feedly_base_url", &self.feedly_base_url)?;
        check_url("spotify_api_url", &self.spotify_api_url)?;
        check_url("spotify_accounts_url", &self.spotify_accounts_url)?;
        if self.music_category.trim().is_empty() {
            return Err(AppError::Config("music_category is empty".to_string()));
        }
        Ok(())
    }
}

pub(crate) fn require<'a>(name: &str, value: &'a Option<String>) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Config(format!("{} is not set", name))),
    }
}

fn check_url(name: &str, value: &str) -> Result<()> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| AppError::Config(format!("{} is not a valid URL ({}): {}", name, value, e)))
}
