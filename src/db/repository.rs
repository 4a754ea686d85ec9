use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tokio::sync::broadcast;
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    ArticleFilter, ArticleImage, ArticleStatus, ContentRequest, GeneratedArticle, NewArticle,
    NewArticleImage, NewContentRequest, RequestStatus, ReviewStatus,
};

use super::changes::{ChangeFeed, ARTICLE_IMAGES, CONTENT_REQUESTS, GENERATED_ARTICLES};
use super::schema::SCHEMA;
use super::{ChangeEvent, ChangeKind};

const REQUEST_COLUMNS: &str = "id, title, content_type, keywords, status, progress, batch_id, \
     primary_keyword, error_message, article_id, created_at, updated_at";

const ARTICLE_COLUMNS: &str = "id, request_id, title, slug, body, excerpt, word_count, \
     reading_time_minutes, quality_score, seo_score, keywords, category, meta_title, \
     meta_description, status, review_status, view_count, published_at, created_at, updated_at";

pub struct Repository {
    conn: Connection,
    changes: ChangeFeed,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            changes: ChangeFeed::new(),
        })
    }

    #[cfg(test)]
    pub(crate) async fn execute_sql(&self, sql: &'static str) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute_batch(sql)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Subscribe to row-level insert/update/delete notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    // Content request operations

    pub async fn create_request(&self, request: NewContentRequest) -> Result<ContentRequest> {
        let id = Uuid::new_v4();
        let keywords_json = serde_json::to_string(&request.keywords)?;
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO content_requests (id, title, content_type, keywords, status, progress, batch_id)
                     VALUES (?1, ?2, ?3, ?4, 'pending', 0, ?5)",
                    params![
                        id.to_string(),
                        request.title,
                        request.content_type,
                        keywords_json,
                        request.batch_id.map(|b| b.to_string()),
                    ],
                )?;
                Ok(())
            })
            .await?;

        self.changes.publish(CONTENT_REQUESTS, ChangeKind::Insert, id);
        self.get_request(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("content request {}", id)))
    }

    pub async fn get_request(&self, id: Uuid) -> Result<Option<ContentRequest>> {
        let request = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM content_requests WHERE id = ?1",
                    REQUEST_COLUMNS
                ))?;
                let request = stmt
                    .query_row(params![id.to_string()], request_from_row)
                    .optional()?;
                Ok(request)
            })
            .await?;
        Ok(request)
    }

    pub async fn list_requests(&self, batch_id: Option<Uuid>) -> Result<Vec<ContentRequest>> {
        let requests = self
            .conn
            .call(move |conn| {
                let requests = match batch_id {
                    Some(batch_id) => {
                        let mut stmt = conn.prepare(&format!(
                            "SELECT {} FROM content_requests WHERE batch_id = ?1 ORDER BY created_at, rowid",
                            REQUEST_COLUMNS
                        ))?;
                        let rows = stmt
                            .query_map(params![batch_id.to_string()], request_from_row)?
                            .collect::<std::result::Result<Vec<_>, _>>()?;
                        rows
                    }
                    None => {
                        let mut stmt = conn.prepare(&format!(
                            "SELECT {} FROM content_requests ORDER BY created_at DESC, rowid DESC",
                            REQUEST_COLUMNS
                        ))?;
                        let rows = stmt
                            .query_map([], request_from_row)?
                            .collect::<std::result::Result<Vec<_>, _>>()?;
                        rows
                    }
                };
                Ok(requests)
            })
            .await?;
        Ok(requests)
    }

    /// Move a request to `processing` and raise its progress. Progress never
    /// goes down and terminal requests are left untouched.
    pub async fn update_request_progress(&self, id: Uuid, progress: u8) -> Result<()> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE content_requests
                     SET status = 'processing', progress = MAX(progress, ?2), updated_at = datetime('now')
                     WHERE id = ?1 AND status NOT IN ('completed', 'failed')",
                    params![id.to_string(), progress.min(100)],
                )?;
                Ok(changed)
            })
            .await?;
        if changed > 0 {
            self.changes.publish(CONTENT_REQUESTS, ChangeKind::Update, id);
        }
        Ok(())
    }

    pub async fn set_primary_keyword(&self, id: Uuid, keyword: String) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE content_requests SET primary_keyword = ?2, updated_at = datetime('now') WHERE id = ?1",
                    params![id.to_string(), keyword],
                )?;
                Ok(())
            })
            .await?;
        self.changes.publish(CONTENT_REQUESTS, ChangeKind::Update, id);
        Ok(())
    }

    pub async fn complete_request(&self, id: Uuid, article_id: Uuid) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE content_requests
                     SET status = 'completed', progress = 100, article_id = ?2, updated_at = datetime('now')
                     WHERE id = ?1",
                    params![id.to_string(), article_id.to_string()],
                )?;
                Ok(())
            })
            .await?;
        self.changes.publish(CONTENT_REQUESTS, ChangeKind::Update, id);
        Ok(())
    }

    pub async fn fail_request(&self, id: Uuid, message: String) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE content_requests
                     SET status = 'failed', error_message = ?2, updated_at = datetime('now')
                     WHERE id = ?1",
                    params![id.to_string(), message],
                )?;
                Ok(())
            })
            .await?;
        self.changes.publish(CONTENT_REQUESTS, ChangeKind::Update, id);
        Ok(())
    }

    // Article operations

    pub async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let slug = slug.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM generated_articles WHERE slug = ?1",
                    params![slug],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    pub async fn insert_article(&self, article: NewArticle) -> Result<GeneratedArticle> {
        let id = Uuid::new_v4();
        let keywords_json = serde_json::to_string(&article.keywords)?;
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO generated_articles (id, request_id, title, slug, body, excerpt, word_count,
                           reading_time_minutes, quality_score, seo_score, keywords, category, meta_title,
                           meta_description)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"#,
                    params![
                        id.to_string(),
                        article.request_id.to_string(),
                        article.title,
                        article.slug,
                        article.body,
                        article.excerpt,
                        article.word_count,
                        article.reading_time_minutes,
                        article.quality_score,
                        article.seo_score,
                        keywords_json,
                        article.category,
                        article.meta_title,
                        article.meta_description,
                    ],
                )?;
                Ok(())
            })
            .await?;

        self.changes.publish(GENERATED_ARTICLES, ChangeKind::Insert, id);
        self.find_article(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("article {}", id)))
    }

    /// Fetch an article and count the view.
    pub async fn get_article(&self, id: Uuid) -> Result<Option<GeneratedArticle>> {
        let article = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE generated_articles SET view_count = view_count + 1 WHERE id = ?1",
                    params![id.to_string()],
                )?;
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM generated_articles WHERE id = ?1",
                    ARTICLE_COLUMNS
                ))?;
                let article = stmt
                    .query_row(params![id.to_string()], article_from_row)
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    /// Fetch an article by slug and count the view.
    pub async fn get_article_by_slug(&self, slug: &str) -> Result<Option<GeneratedArticle>> {
        let slug = slug.to_string();
        let article = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE generated_articles SET view_count = view_count + 1 WHERE slug = ?1",
                    params![slug],
                )?;
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM generated_articles WHERE slug = ?1",
                    ARTICLE_COLUMNS
                ))?;
                let article = stmt.query_row(params![slug], article_from_row).optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    /// Fetch without touching the view counter.
    async fn find_article(&self, id: Uuid) -> Result<Option<GeneratedArticle>> {
        let article = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM generated_articles WHERE id = ?1",
                    ARTICLE_COLUMNS
                ))?;
                let article = stmt
                    .query_row(params![id.to_string()], article_from_row)
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    pub async fn list_articles(&self, filter: ArticleFilter) -> Result<Vec<GeneratedArticle>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(status) = filter.status {
            clauses.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(category) = filter.category {
            clauses.push("category = ?");
            values.push(Value::Text(category));
        }
        if let Some(keyword) = filter.keyword {
            let pattern = format!("%{}%", escape_like(&keyword.to_lowercase()));
            clauses.push("(LOWER(title) LIKE ? ESCAPE '\\' OR LOWER(keywords) LIKE ? ESCAPE '\\')");
            values.push(Value::Text(pattern.clone()));
            values.push(Value::Text(pattern));
        }
        if let Some(after) = filter.created_after {
            clauses.push("created_at >= ?");
            values.push(Value::Text(format_datetime(&after)));
        }
        if let Some(before) = filter.created_before {
            clauses.push("created_at <= ?");
            values.push(Value::Text(format_datetime(&before)));
        }

        let mut sql = format!("SELECT {} FROM generated_articles", ARTICLE_COLUMNS);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        let direction = filter.direction.keyword();
        sql.push_str(&format!(
            " ORDER BY {} {}, rowid {}",
            filter.sort.column(),
            direction,
            direction
        ));
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(i64::from(limit)));
        }

        let articles = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let articles = stmt
                    .query_map(params_from_iter(values.iter()), article_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    /// Returns false when no article has this id.
    pub async fn update_article_status(&self, id: Uuid, status: ArticleStatus) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = if status == ArticleStatus::Published {
                    conn.execute(
                        "UPDATE generated_articles
                         SET status = ?2, published_at = COALESCE(published_at, datetime('now')),
                             updated_at = datetime('now')
                         WHERE id = ?1",
                        params![id.to_string(), status.as_str()],
                    )?
                } else {
                    conn.execute(
                        "UPDATE generated_articles SET status = ?2, updated_at = datetime('now') WHERE id = ?1",
                        params![id.to_string(), status.as_str()],
                    )?
                };
                Ok(changed)
            })
            .await?;
        if changed > 0 {
            self.changes.publish(GENERATED_ARTICLES, ChangeKind::Update, id);
        }
        Ok(changed > 0)
    }

    pub async fn update_review_status(&self, id: Uuid, review: ReviewStatus) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE generated_articles SET review_status = ?2, updated_at = datetime('now') WHERE id = ?1",
                    params![id.to_string(), review.as_str()],
                )?;
                Ok(changed)
            })
            .await?;
        if changed > 0 {
            self.changes.publish(GENERATED_ARTICLES, ChangeKind::Update, id);
        }
        Ok(changed > 0)
    }

    pub async fn delete_article(&self, id: Uuid) -> Result<bool> {
        let changed = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM article_images WHERE article_id = ?1",
                    params![id.to_string()],
                )?;
                let changed = tx.execute(
                    "DELETE FROM generated_articles WHERE id = ?1",
                    params![id.to_string()],
                )?;
                tx.commit()?;
                Ok(changed)
            })
            .await?;
        if changed > 0 {
            self.changes.publish(GENERATED_ARTICLES, ChangeKind::Delete, id);
        }
        Ok(changed > 0)
    }

    // Image operations

    pub async fn insert_images(&self, article_id: Uuid, images: Vec<NewArticleImage>) -> Result<usize> {
        let ids = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut ids = Vec::with_capacity(images.len());
                for image in images {
                    tx.execute(
                        "INSERT INTO article_images (article_id, url, alt_text, prompt) VALUES (?1, ?2, ?3, ?4)",
                        params![article_id.to_string(), image.url, image.alt_text, image.prompt],
                    )?;
                    ids.push(tx.last_insert_rowid());
                }
                tx.commit()?;
                Ok(ids)
            })
            .await?;
        for id in &ids {
            self.changes.publish(ARTICLE_IMAGES, ChangeKind::Insert, id);
        }
        Ok(ids.len())
    }

    pub async fn list_images(&self, article_id: Uuid) -> Result<Vec<ArticleImage>> {
        let images = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, article_id, url, alt_text, prompt FROM article_images WHERE article_id = ?1 ORDER BY id",
                )?;
                let images = stmt
                    .query_map(params![article_id.to_string()], image_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(images)
            })
            .await?;
        Ok(images)
    }
}

/// Makes `%`, `_` and `\` match literally in a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn uuid_column(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let value: String = row.get(idx)?;
    Uuid::parse_str(&value).map_err(|e| conversion_error(idx, e))
}

fn optional_uuid_column(row: &Row, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    row.get::<_, Option<String>>(idx)?
        .map(|value| Uuid::parse_str(&value).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn keywords_column(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let value: String = row.get(idx)?;
    serde_json::from_str(&value).map_err(|e| conversion_error(idx, e))
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    Ok(row
        .get::<_, String>(idx)
        .ok()
        .and_then(|s| parse_datetime(&s))
        .unwrap_or_else(Utc::now))
}

fn request_from_row(row: &Row) -> rusqlite::Result<ContentRequest> {
    let status: String = row.get(4)?;
    Ok(ContentRequest {
        id: uuid_column(row, 0)?,
        title: row.get(1)?,
        content_type: row.get(2)?,
        keywords: keywords_column(row, 3)?,
        status: status
            .parse::<RequestStatus>()
            .map_err(|e| conversion_error(4, e))?,
        progress: row.get(5)?,
        batch_id: optional_uuid_column(row, 6)?,
        primary_keyword: row.get(7)?,
        error_message: row.get(8)?,
        article_id: optional_uuid_column(row, 9)?,
        created_at: timestamp_column(row, 10)?,
        updated_at: timestamp_column(row, 11)?,
    })
}

fn article_from_row(row: &Row) -> rusqlite::Result<GeneratedArticle> {
    let status: String = row.get(14)?;
    let review_status: String = row.get(15)?;
    Ok(GeneratedArticle {
        id: uuid_column(row, 0)?,
        request_id: uuid_column(row, 1)?,
        title: row.get(2)?,
        slug: row.get(3)?,
        body: row.get(4)?,
        excerpt: row.get(5)?,
        word_count: row.get(6)?,
        reading_time_minutes: row.get(7)?,
        quality_score: row.get(8)?,
        seo_score: row.get(9)?,
        keywords: keywords_column(row, 10)?,
        category: row.get(11)?,
        meta_title: row.get(12)?,
        meta_description: row.get(13)?,
        status: status
            .parse::<ArticleStatus>()
            .map_err(|e| conversion_error(14, e))?,
        review_status: review_status
            .parse::<ReviewStatus>()
            .map_err(|e| conversion_error(15, e))?,
        view_count: row.get::<_, i64>(16)?.max(0) as u64,
        published_at: row
            .get::<_, Option<String>>(17)?
            .and_then(|s| parse_datetime(&s)),
        created_at: timestamp_column(row, 18)?,
        updated_at: timestamp_column(row, 19)?,
    })
}

fn image_from_row(row: &Row) -> rusqlite::Result<ArticleImage> {
    Ok(ArticleImage {
        id: row.get(0)?,
        article_id: uuid_column(row, 1)?,
        url: row.get(2)?,
        alt_text: row.get(3)?,
        prompt: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo_with_request() -> (Repository, ContentRequest) {
        let repo = Repository::open_in_memory().await.unwrap();
        let request = repo
            .create_request(NewContentRequest {
                title: "Rust for AI teams".to_string(),
                content_type: "blog_post".to_string(),
                keywords: vec!["rust ai".to_string()],
                batch_id: None,
            })
            .await
            .unwrap();
        (repo, request)
    }

    fn new_article(request_id: Uuid, slug: &str) -> NewArticle {
        NewArticle {
            request_id,
            title: format!("Title for {}", slug),
            slug: slug.to_string(),
            body: "Body text".to_string(),
            excerpt: "Excerpt".to_string(),
            word_count: 2,
            reading_time_minutes: 1,
            quality_score: 40,
            seo_score: 55,
            keywords: vec!["rust ai".to_string()],
            category: Some("engineering".to_string()),
            meta_title: None,
            meta_description: None,
        }
    }

    #[tokio::test]
    async fn new_request_starts_pending_at_zero() {
        let (repo, request) = repo_with_request().await;
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.progress, 0);
        assert_eq!(request.keywords, vec!["rust ai".to_string()]);

        let listed = repo.list_requests(None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, request.id);
    }

    #[tokio::test]
    async fn progress_never_decreases() {
        let (repo, request) = repo_with_request().await;
        repo.update_request_progress(request.id, 40).await.unwrap();
        repo.update_request_progress(request.id, 20).await.unwrap();

        let stored = repo.get_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Processing);
        assert_eq!(stored.progress, 40);
    }

    #[tokio::test]
    async fn terminal_request_ignores_progress_updates() {
        let (repo, request) = repo_with_request().await;
        repo.update_request_progress(request.id, 15).await.unwrap();
        repo.fail_request(request.id, "research failed".to_string())
            .await
            .unwrap();
        repo.update_request_progress(request.id, 90).await.unwrap();

        let stored = repo.get_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Failed);
        assert_eq!(stored.progress, 15);
        assert_eq!(stored.error_message.as_deref(), Some("research failed"));
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected_by_store() {
        let (repo, request) = repo_with_request().await;
        repo.insert_article(new_article(request.id, "rust-for-ai"))
            .await
            .unwrap();
        assert!(repo.slug_exists("rust-for-ai").await.unwrap());

        let err = repo
            .insert_article(new_article(request.id, "rust-for-ai"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn get_article_counts_views() {
        let (repo, request) = repo_with_request().await;
        let article = repo
            .insert_article(new_article(request.id, "views"))
            .await
            .unwrap();
        assert_eq!(article.view_count, 0);

        repo.get_article(article.id).await.unwrap();
        let again = repo.get_article_by_slug("views").await.unwrap().unwrap();
        assert_eq!(again.view_count, 2);
    }

    #[tokio::test]
    async fn publishing_sets_published_at_once() {
        let (repo, request) = repo_with_request().await;
        let article = repo
            .insert_article(new_article(request.id, "publish-me"))
            .await
            .unwrap();
        assert!(article.published_at.is_none());

        assert!(repo
            .update_article_status(article.id, ArticleStatus::Published)
            .await
            .unwrap());
        let published = repo.find_article(article.id).await.unwrap().unwrap();
        assert_eq!(published.status, ArticleStatus::Published);
        let first_published = published.published_at.unwrap();

        repo.update_article_status(article.id, ArticleStatus::Draft)
            .await
            .unwrap();
        repo.update_article_status(article.id, ArticleStatus::Published)
            .await
            .unwrap();
        let republished = repo.find_article(article.id).await.unwrap().unwrap();
        assert_eq!(republished.published_at.unwrap(), first_published);

        assert!(!repo
            .update_article_status(Uuid::new_v4(), ArticleStatus::Archived)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn list_articles_filters_and_sorts() {
        let (repo, request) = repo_with_request().await;
        let mut low = new_article(request.id, "low-seo");
        low.seo_score = 10;
        let mut high = new_article(request.id, "high-seo");
        high.seo_score = 90;
        high.category = Some("news".to_string());
        high.keywords = vec!["llm agents".to_string()];
        repo.insert_article(low).await.unwrap();
        let high = repo.insert_article(high).await.unwrap();

        let by_seo = repo
            .list_articles(ArticleFilter {
                sort: crate::models::SortField::SeoScore,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_seo[0].slug, "high-seo");

        let news = repo
            .list_articles(ArticleFilter {
                category: Some("news".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(news.len(), 1);

        let agents = repo
            .list_articles(ArticleFilter {
                keyword: Some("LLM".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].id, high.id);

        repo.update_article_status(high.id, ArticleStatus::Published)
            .await
            .unwrap();
        let published = repo
            .list_articles(ArticleFilter {
                status: Some(ArticleStatus::Published),
                limit: Some(5),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(published.len(), 1);

        let future = repo
            .list_articles(ArticleFilter {
                created_after: Some(Utc::now() + chrono::Duration::days(1)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(future.is_empty());
    }

    #[tokio::test]
    async fn keyword_filter_matches_wildcards_literally() {
        let (repo, request) = repo_with_request().await;
        let mut literal = new_article(request.id, "uptime-literal");
        literal.title = "Reaching 100% uptime".to_string();
        literal.keywords = vec!["sla_tiers".to_string()];
        let mut lookalike = new_article(request.id, "uptime-lookalike");
        lookalike.title = "1000 uptime tips".to_string();
        lookalike.keywords = vec!["sla tiers".to_string()];
        let literal = repo.insert_article(literal).await.unwrap();
        repo.insert_article(lookalike).await.unwrap();

        for keyword in ["100%", "sla_tiers"] {
            let found = repo
                .list_articles(ArticleFilter {
                    keyword: Some(keyword.to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert_eq!(found.len(), 1, "keyword {:?}", keyword);
            assert_eq!(found[0].id, literal.id);
        }
    }

    #[test]
    fn escape_like_escapes_wildcards_and_backslash() {
        assert_eq!(escape_like(r"50%_off\now"), r"50\%\_off\\now");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[tokio::test]
    async fn delete_article_removes_images() {
        let (repo, request) = repo_with_request().await;
        let article = repo
            .insert_article(new_article(request.id, "with-images"))
            .await
            .unwrap();
        let inserted = repo
            .insert_images(
                article.id,
                vec![NewArticleImage {
                    url: "https://img.example/1.png".to_string(),
                    alt_text: Some("diagram".to_string()),
                    prompt: None,
                }],
            )
            .await
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(repo.list_images(article.id).await.unwrap().len(), 1);

        assert!(repo.delete_article(article.id).await.unwrap());
        assert!(repo.list_images(article.id).await.unwrap().is_empty());
        assert!(repo.find_article(article.id).await.unwrap().is_none());
        assert!(!repo.delete_article(article.id).await.unwrap());
    }

    #[tokio::test]
    async fn mutations_are_broadcast() {
        let (repo, request) = repo_with_request().await;
        let mut changes = repo.subscribe();

        let article = repo
            .insert_article(new_article(request.id, "feed"))
            .await
            .unwrap();
        repo.update_review_status(article.id, ReviewStatus::Approved)
            .await
            .unwrap();
        repo.delete_article(article.id).await.unwrap();

        let kinds: Vec<ChangeKind> = (0..3)
            .map(|_| changes.try_recv().unwrap())
            .inspect(|event| assert_eq!(event.table, GENERATED_ARTICLES))
            .map(|event| event.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]
        );
    }

    #[tokio::test]
    async fn opens_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.db");
        let repo = Repository::new(path.to_str().unwrap()).await.unwrap();
        assert!(repo.list_requests(None).await.unwrap().is_empty());
        assert!(path.exists());
    }
}
