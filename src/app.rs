use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::ai::{RemoteServices, Writer};
use crate::config::{Config, ContentBackend};
use crate::db::{Repository, GENERATED_ARTICLES};
use crate::error::{AppError, Result};
use crate::models::{
    ArticleFilter, ArticleImage, ArticleStatus, ContentRequest, GeneratedArticle, ReviewStatus,
};
use crate::pipeline::{
    parse_batch_csv, BatchOptions, BatchReport, GenerationInput, GenerationOutcome, Orchestrator,
    ProgressEvent,
};
use crate::services::{FunctionsClient, Mailer};

pub struct App {
    config: Config,
    orchestrator: Orchestrator,
    mailer: Option<Mailer>,
}

impl App {
    pub async fn new(
        config: Config,
        progress_tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
    ) -> Result<Self> {
        let repository = Arc::new(Repository::new(&config.db_path).await?);

        let functions = FunctionsClient::new(&config.functions_url, config.functions_key.clone())?;
        let writer = match (config.content_backend, &config.claude_api_key) {
            (ContentBackend::Claude, Some(key)) => {
                Some(Writer::new(key.clone(), config.claude_model.clone())?)
            }
            _ => None,
        };
        let services = Arc::new(RemoteServices::new(functions, writer));

        let mut orchestrator = Orchestrator::new(services, repository)
            .with_concurrent_enrichment(config.concurrent_enrichment);
        if let Some(tx) = progress_tx {
            orchestrator = orchestrator.with_progress(tx);
        }

        let mailer = match &config.email {
            Some(email) => match (&email.api_key, &email.notify_to) {
                (Some(key), Some(_)) => Some(Mailer::new(
                    email.api_url.clone(),
                    key.clone(),
                    email.from.clone(),
                )?),
                _ => {
                    tracing::warn!("email configured without api_key or notify_to, notifications disabled");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            config,
            orchestrator,
            mailer,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn repository(&self) -> &Arc<Repository> {
        self.orchestrator.repository()
    }

    /// Follow the store's change feed and refetch the article list whenever
    /// an article row is inserted, updated or deleted.
    pub fn watch_changes(&self) -> JoinHandle<()> {
        let repository = Arc::clone(self.repository());
        let mut rx = repository.subscribe();
        tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "change feed lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                tracing::debug!(table = event.table, kind = ?event.kind, id = %event.id, "store changed");
                if event.table != GENERATED_ARTICLES {
                    continue;
                }
                match repository.list_articles(ArticleFilter::default()).await {
                    Ok(articles) => tracing::info!(articles = articles.len(), "article list refreshed"),
                    Err(e) => tracing::warn!("failed to refresh article list: {}", e),
                }
            }
        })
    }

    pub async fn generate(&self, input: GenerationInput) -> Result<GenerationOutcome> {
        self.orchestrator.run(input).await
    }

    pub async fn run_batch_file(&self, path: &Path, delay: Option<Duration>) -> Result<BatchReport> {
        let text = std::fs::read_to_string(path)?;
        let rows = parse_batch_csv(&text)?;
        if rows.is_empty() {
            return Err(AppError::Validation(format!("{} has no data rows", path.display())));
        }

        let options = BatchOptions {
            delay: delay.unwrap_or(Duration::from_millis(self.config.batch_delay_ms)),
            content_type: self.config.default_content_type.clone(),
            settings: self.config.generation_settings(),
        };
        let report = self.orchestrator.run_batch(rows, &options).await;

        self.notify_batch(&report).await;
        Ok(report)
    }

    async fn notify_batch(&self, report: &BatchReport) {
        let Some(mailer) = &self.mailer else {
            return;
        };
        let Some(to) = self.config.email.as_ref().and_then(|e| e.notify_to.as_deref()) else {
            return;
        };

        let subject = format!(
            "Content batch finished: {} completed, {} failed",
            report.success_count(),
            report.failure_count()
        );
        match mailer.send(to, &subject, &report.to_html()).await {
            Ok(id) => tracing::info!(batch_id = %report.batch_id, message_id = %id, "batch summary emailed"),
            Err(e) => tracing::warn!(batch_id = %report.batch_id, "failed to email batch summary: {}", e),
        }
    }

    pub async fn list_articles(&self, filter: ArticleFilter) -> Result<Vec<GeneratedArticle>> {
        self.repository().list_articles(filter).await
    }

    pub async fn list_requests(&self, batch_id: Option<Uuid>) -> Result<Vec<ContentRequest>> {
        self.repository().list_requests(batch_id).await
    }

    /// Look an article up by id, falling back to slug. Counts as a view.
    pub async fn open_article(&self, id_or_slug: &str) -> Result<(GeneratedArticle, Vec<ArticleImage>)> {
        let article = match Uuid::parse_str(id_or_slug) {
            Ok(id) => self.repository().get_article(id).await?,
            Err(_) => self.repository().get_article_by_slug(id_or_slug).await?,
        }
        .ok_or_else(|| AppError::NotFound(format!("article {}", id_or_slug)))?;

        let images = self.repository().list_images(article.id).await?;
        Ok((article, images))
    }

    pub async fn set_status(&self, id: Uuid, status: ArticleStatus) -> Result<()> {
        if !self.repository().update_article_status(id, status).await? {
            return Err(AppError::NotFound(format!("article {}", id)));
        }
        tracing::info!(article_id = %id, %status, "article status updated");
        Ok(())
    }

    pub async fn set_review(&self, id: Uuid, review: ReviewStatus) -> Result<()> {
        if !self.repository().update_review_status(id, review).await? {
            return Err(AppError::NotFound(format!("article {}", id)));
        }
        Ok(())
    }

    pub async fn delete_article(&self, id: Uuid) -> Result<()> {
        if !self.repository().delete_article(id).await? {
            return Err(AppError::NotFound(format!("article {}", id)));
        }
        tracing::info!(article_id = %id, "article deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmailConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_function(server: &MockServer, name: &str, data: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(format!("/functions/v1/{}", name)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": data})),
            )
            .mount(server)
            .await;
    }

    fn config_for(server: &MockServer, dir: &tempfile::TempDir) -> Config {
        Config {
            db_path: dir.path().join("content.db").to_string_lossy().to_string(),
            functions_url: format!("{}/functions/v1", server.uri()),
            batch_delay_ms: 0,
            include_images: false,
            email: Some(EmailConfig {
                api_url: format!("{}/emails", server.uri()),
                api_key: Some("re_key".to_string()),
                from: "studio@example.com".to_string(),
                notify_to: Some("ops@example.com".to_string()),
            }),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn batch_file_runs_end_to_end_and_emails_summary() {
        let server = MockServer::start().await;
        mount_function(&server, "keyword-research", json!({"primaryKeyword": "ai consulting"})).await;
        mount_function(&server, "serp-analysis", json!({"commonHeadings": ["Pricing"]})).await;
        mount_function(
            &server,
            "generate-content",
            json!({"title": "AI consulting pricing", "content": "## Pricing\n\nIt depends."}),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("batch.csv");
        std::fs::write(&csv_path, "topic,keywords\nAI pricing,ai consulting\nAI retainers,\n").unwrap();

        let app = App::new(config_for(&server, &dir), None).await.unwrap();
        let report = app.run_batch_file(&csv_path, None).await.unwrap();

        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failure_count(), 0);
        let slugs: Vec<&str> = report.completed.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs[0], "ai-consulting-pricing");
        assert!(slugs[1].starts_with("ai-consulting-pricing-"));

        let (article, images) = app.open_article("ai-consulting-pricing").await.unwrap();
        assert_eq!(article.view_count, 1);
        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn email_failure_does_not_fail_the_batch() {
        let server = MockServer::start().await;
        mount_function(&server, "keyword-research", json!({"primaryKeyword": "edge ai"})).await;
        mount_function(&server, "serp-analysis", json!({})).await;
        mount_function(
            &server,
            "generate-content",
            json!({"title": "Edge AI basics", "content": "## Basics\n\nRun models close to data."}),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(500).set_body_string("mail relay down"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("batch.csv");
        std::fs::write(&csv_path, "topic\nEdge AI\n").unwrap();

        let app = App::new(config_for(&server, &dir), None).await.unwrap();
        let report = tokio_test::assert_ok!(app.run_batch_file(&csv_path, None).await);
        assert_eq!(report.success_count(), 1);
        assert_eq!(report.failure_count(), 0);
    }

    #[tokio::test]
    async fn article_management_reports_missing_ids() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(config_for(&server, &dir), None).await.unwrap();

        let missing = Uuid::new_v4();
        assert!(matches!(
            app.set_status(missing, ArticleStatus::Published).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            app.delete_article(missing).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            app.open_article("no-such-slug").await,
            Err(AppError::NotFound(_))
        ));
        tokio_test::assert_ok!(app.list_requests(None).await);
    }

    #[tokio::test]
    async fn watcher_survives_article_changes() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(config_for(&server, &dir), None).await.unwrap();
        let watcher = app.watch_changes();

        let mut rx = app.repository().subscribe();
        let request = app
            .repository()
            .create_request(crate::models::NewContentRequest {
                title: "Watched".to_string(),
                content_type: "blog_post".to_string(),
                keywords: vec![],
                batch_id: None,
            })
            .await
            .unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.id, request.id.to_string());

        assert!(!watcher.is_finished());
        watcher.abort();
    }
}
