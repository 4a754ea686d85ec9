pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- content_requests table
CREATE TABLE IF NOT EXISTS content_requests (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    content_type TEXT NOT NULL,
    keywords TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL DEFAULT 'pending',
    progress INTEGER NOT NULL DEFAULT 0,
    batch_id TEXT,
    primary_keyword TEXT,
    error_message TEXT,
    article_id TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_content_requests_batch_id ON content_requests(batch_id);
CREATE INDEX IF NOT EXISTS idx_content_requests_status ON content_requests(status);

-- generated_articles table
CREATE TABLE IF NOT EXISTS generated_articles (
    id TEXT PRIMARY KEY,
    request_id TEXT NOT NULL REFERENCES content_requests(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    body TEXT NOT NULL,
    excerpt TEXT NOT NULL,
    word_count INTEGER NOT NULL DEFAULT 0,
    reading_time_minutes INTEGER NOT NULL DEFAULT 1,
    quality_score INTEGER NOT NULL DEFAULT 0,
    seo_score INTEGER NOT NULL DEFAULT 0,
    keywords TEXT NOT NULL DEFAULT '[]',
    category TEXT,
    meta_title TEXT,
    meta_description TEXT,
    status TEXT NOT NULL DEFAULT 'draft',
    review_status TEXT NOT NULL DEFAULT 'pending',
    view_count INTEGER NOT NULL DEFAULT 0,
    published_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_generated_articles_slug ON generated_articles(slug);
CREATE INDEX IF NOT EXISTS idx_generated_articles_status ON generated_articles(status);
CREATE INDEX IF NOT EXISTS idx_generated_articles_created_at ON generated_articles(created_at DESC);

-- article_images table
CREATE TABLE IF NOT EXISTS article_images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id TEXT NOT NULL REFERENCES generated_articles(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    alt_text TEXT,
    prompt TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_article_images_article_id ON article_images(article_id);
"#;
