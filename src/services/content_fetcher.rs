use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};

use crate::error::{AppError, Result};

const USER_AGENT_STRING: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
const OG_IMAGE_SELECTOR: &str = r#"head > meta[property="og:image"]"#;

/// Result of fetching an article page. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// `body` is the response exactly as served, in the page's own charset.
    Fetched {
        body: Vec<u8>,
        og_image: Option<String>,
    },
    Failed {
        reason: String,
    },
}

#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> ScrapeOutcome;
}

pub struct ContentFetcher {
    client: Client,
}

impl ContentFetcher {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_page(&self, url: &str) -> Result<Vec<u8>> {
        if url.is_empty() {
            return Err(AppError::Scrape("entry has no URL".to_string()));
        }

        let response = self.client.get(url).send().await?;

        // Redirects are followed; anything but a final 200 is a miss
        if response.status() != StatusCode::OK {
            return Err(AppError::Scrape(format!("HTTP {}", response.status())));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl PageScraper for ContentFetcher {
    async fn scrape(&self, url: &str) -> ScrapeOutcome {
        match self.fetch_page(url).await {
            Ok(body) => {
                // Meta tags are ASCII, so a lossy view is enough to find them
                let og_image = extract_og_image(&String::from_utf8_lossy(&body));
                ScrapeOutcome::Fetched { body, og_image }
            }
            Err(e) => ScrapeOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// Pull the `content` of `<meta property="og:image">` out of the page head.
pub fn extract_og_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(OG_IMAGE_SELECTOR).ok()?;

    document
        .select(&selector)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(|content| content.to_string())
}
