pub const SCHEMA: &str = r#"
-- entries table: one document per saved article, keyed by normalized origin id
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    published TEXT NOT NULL,
    url TEXT NOT NULL,
    feedly_id TEXT NOT NULL,
    summary TEXT,
    common_topics TEXT NOT NULL DEFAULT '[]',
    src TEXT,
    raw_html TEXT NOT NULL DEFAULT '',
    og_image TEXT,
    stored_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- blobs table: scraped page bodies, keyed by "<entry id>/raw_html.txt"
CREATE TABLE IF NOT EXISTS blobs (
    key TEXT PRIMARY KEY NOT NULL,
    content BLOB NOT NULL,
    uploaded_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
