use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::Entry;

use super::schema::SCHEMA;

/// Document and blob storage the feed-to-store job writes into.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn exists(&self, id: &str) -> Result<bool>;

    /// Unconditional upsert.
    async fn set(&self, id: &str, entry: &Entry) -> Result<()>;

    /// Stores the page body byte-for-byte, whatever its charset.
    async fn upload_blob(&self, key: &str, content: &[u8]) -> Result<()>;
}

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    #[allow(dead_code)]
    pub async fn get_entry(&self, id: &str) -> Result<Option<Entry>> {
        let id = id.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, published, url, feedly_id, summary, common_topics, src, raw_html, og_image
                     FROM entries WHERE id = ?1",
                )?;
                let row = stmt
                    .query_row(params![id], entry_row)
                    .optional()?;
                Ok(row)
            })
            .await?;

        match row {
            Some((mut entry, topics)) => {
                entry.common_topics = serde_json::from_str(&topics)?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    #[allow(dead_code)]
    pub async fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = key.to_string();
        let content = self
            .conn
            .call(move |conn| {
                let content = conn
                    .query_row(
                        "SELECT content FROM blobs WHERE key = ?1",
                        params![key],
                        |row| row.get::<_, Vec<u8>>(0),
                    )
                    .optional()?;
                Ok(content)
            })
            .await?;
        Ok(content)
    }

    pub async fn count_entries(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl DocumentStore for Repository {
    async fn exists(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    async fn set(&self, id: &str, entry: &Entry) -> Result<()> {
        let id = id.to_string();
        let entry = entry.clone();
        let topics_json = serde_json::to_string(&entry.common_topics)?;
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO entries (id, title, published, url, feedly_id, summary, common_topics, src, raw_html, og_image)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                       ON CONFLICT(id) DO UPDATE SET
                           title = excluded.title,
                           published = excluded.published,
                           url = excluded.url,
                           feedly_id = excluded.feedly_id,
                           summary = excluded.summary,
                           common_topics = excluded.common_topics,
                           src = excluded.src,
                           raw_html = excluded.raw_html,
                           og_image = excluded.og_image,
                           stored_at = datetime('now')"#,
                    params![
                        id,
                        entry.title,
                        entry.published,
                        entry.url,
                        entry.feedly_id,
                        entry.summary,
                        topics_json,
                        entry.src,
                        entry.raw_html,
                        entry.og_image,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn upload_blob(&self, key: &str, content: &[u8]) -> Result<()> {
        let key = key.to_string();
        let content = content.to_vec();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO blobs (key, content) VALUES (?1, ?2)
                       ON CONFLICT(key) DO UPDATE SET
                           content = excluded.content,
                           uploaded_at = datetime('now')"#,
                    params![key, content],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn entry_row(row: &Row) -> rusqlite::Result<(Entry, String)> {
    let entry = Entry {
        id: row.get(0)?,
        title: row.get(1)?,
        published: row.get(2)?,
        url: row.get(3)?,
        feedly_id: row.get(4)?,
        summary: row.get(5)?,
        common_topics: Vec::new(),
        src: row.get(7)?,
        raw_html: row.get(8)?,
        og_image: row.get(9)?,
    };
    Ok((entry, row.get(6)?))
}
