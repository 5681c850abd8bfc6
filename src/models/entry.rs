use serde::{Deserialize, Deserializer, Serialize};

/// An item as returned by the stream contents endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    pub origin_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "opaque_string")]
    pub published: String,
    #[serde(default)]
    pub alternate: Vec<Link>,
    pub summary: Option<SummaryContent>,
    pub common_topics: Option<Vec<serde_json::Value>>,
    pub origin: Option<Origin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryContent {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    pub stream_id: String,
}

/// A saved article as persisted in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub title: String,
    pub published: String,
    pub url: String,
    pub feedly_id: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub common_topics: Vec<serde_json::Value>,
    pub src: Option<String>,
    /// Blob key of the scraped page, empty when the scrape failed
    #[serde(default)]
    pub raw_html: String,
    pub og_image: Option<String>,
}

impl Entry {
    pub fn from_feed_item(item: &FeedItem) -> Self {
        Self {
            id: normalize_id(&item.origin_id),
            title: item.title.clone().unwrap_or_default(),
            published: item.published.clone(),
            url: item
                .alternate
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            feedly_id: item.id.clone(),
            summary: item.summary.as_ref().and_then(|s| s.content.clone()),
            common_topics: item.common_topics.clone().unwrap_or_default(),
            src: item.origin.as_ref().map(|o| o.stream_id.clone()),
            raw_html: String::new(),
            og_image: None,
        }
    }

    /// Key under which the scraped page body is uploaded.
    pub fn raw_html_blob_key(&self) -> String {
        format!("{}/raw_html.txt", self.id)
    }
}

/// Origin ids are URLs; slashes would nest documents, so flatten them.
pub fn normalize_id(origin_id: &str) -> String {
    origin_id.replace('/', "_")
}

// The service sends timestamps as epoch millis, but the value is carried
// through untouched, so accept whatever scalar shows up.
fn opaque_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}
