mod content_fetcher;
mod spotify;

pub use content_fetcher::{ContentFetcher, PageScraper, ScrapeOutcome};
pub use spotify::{MusicCatalog, SpotifyClient};
