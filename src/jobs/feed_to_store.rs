use crate::db::DocumentStore;
use crate::error::Result;
use crate::feed::{FeedSource, StreamQuery};
use crate::models::Entry;
use crate::services::{PageScraper, ScrapeOutcome};

/// Largest page the stream contents endpoint hands out.
pub const PAGE_SIZE: usize = 500;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub pages_fetched: usize,
    pub added: Vec<String>,
    pub scrape_failures: usize,
    /// Id of the first already-stored entry, which ended the run.
    pub caught_up_at: Option<String>,
}

/// Copies saved articles into the document store, newest first, until it
/// reaches one that a previous run already stored.
pub struct FeedToStoreJob<'a> {
    feed: &'a dyn FeedSource,
    scraper: &'a dyn PageScraper,
    store: &'a dyn DocumentStore,
}

impl<'a> FeedToStoreJob<'a> {
    pub fn new(
        feed: &'a dyn FeedSource,
        scraper: &'a dyn PageScraper,
        store: &'a dyn DocumentStore,
    ) -> Self {
        Self {
            feed,
            scraper,
            store,
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::default();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .feed
                .fetch_saved(StreamQuery::newest(PAGE_SIZE).continuing(continuation.take()))
                .await?;
            report.pages_fetched += 1;
            continuation = page.continuation.filter(|c| !c.is_empty());

            for item in &page.items {
                let mut entry = Entry::from_feed_item(item);
                if entry.id.is_empty() {
                    // An empty id would collide with every other id-less item
                    tracing::warn!("skipping {}: empty origin id", item.id);
                    continue;
                }
                if !self.attach_page(&mut entry).await {
                    report.scrape_failures += 1;
                }

                if self.store.exists(&entry.id).await? {
                    tracing::info!("entry_id: {} already exists", entry.id);
                    report.caught_up_at = Some(entry.id);
                    continuation = None;
                    break;
                }

                tracing::info!("added {}", entry.id);
                self.store.set(&entry.id, &entry).await?;
                report.added.push(entry.id);
            }

            if continuation.is_none() {
                tracing::info!("finished");
                break;
            }
        }

        Ok(report)
    }

    /// Scrape the article page and upload its body. Returns false when the
    /// entry had to be kept without page content.
    async fn attach_page(&self, entry: &mut Entry) -> bool {
        let (body, og_image) = match self.scraper.scrape(&entry.url).await {
            ScrapeOutcome::Fetched { body, og_image } => (body, og_image),
            ScrapeOutcome::Failed { reason } => {
                tracing::warn!("failed to access {}: {}", entry.url, reason);
                return false;
            }
        };

        let key = entry.raw_html_blob_key();
        if let Err(e) = self.store.upload_blob(&key, &body).await {
            tracing::warn!("failed to access {}: blob upload failed: {}", entry.url, e);
            return false;
        }

        entry.raw_html = key;
        entry.og_image = og_image;
        true
    }
}
