use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::ai::types::{
    ContentParams, GeneratedContent, ImageParams, KeywordResearch, KeywordResearchParams,
    SerpAnalysis, SerpParams,
};
use crate::ai::ContentServices;
use crate::content::{
    derive_excerpt, quality_score, reading_time_minutes, seo_score, slugify, suffixed_slug,
    word_count,
};
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{
    ArticleImage, ContentRequest, GeneratedArticle, NewArticle, NewArticleImage, NewContentRequest,
    RequestStatus,
};

use super::phase::{Phase, PhaseResult};
use super::progress::{ProgressEvent, ProgressTracker};

/// Per-run generation knobs.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub tone: String,
    /// Target length in words.
    pub length: u32,
    pub audience: Option<String>,
    pub custom_instructions: Option<String>,
    pub include_images: bool,
    pub image_count: u8,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            tone: "professional".to_string(),
            length: 1500,
            audience: None,
            custom_instructions: None,
            include_images: true,
            image_count: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationInput {
    pub topic: String,
    pub keywords: Vec<String>,
    pub content_type: String,
    pub settings: GenerationSettings,
    pub batch_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub request: ContentRequest,
    pub article: Option<GeneratedArticle>,
    pub images: Vec<ArticleImage>,
    pub phases: Vec<PhaseResult>,
    pub error: Option<String>,
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        self.request.status == RequestStatus::Completed
    }

    /// Turn a hard phase failure into an error for callers that need one.
    pub fn ensure_success(&self) -> Result<()> {
        if self.is_success() {
            return Ok(());
        }
        let message = self
            .error
            .clone()
            .unwrap_or_else(|| format!("request ended {}", self.request.status));
        Err(AppError::Request {
            request_id: self.request.id,
            source: Box::new(AppError::Other(anyhow::anyhow!(message))),
        })
    }
}

/// Drives research → serp → content → images for one topic.
pub struct Orchestrator {
    services: Arc<dyn ContentServices>,
    repository: Arc<Repository>,
    concurrent_enrichment: bool,
    progress_tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl Orchestrator {
    pub fn new(services: Arc<dyn ContentServices>, repository: Arc<Repository>) -> Self {
        Self {
            services,
            repository,
            concurrent_enrichment: false,
            progress_tx: None,
        }
    }

    /// Run research and serp side by side. SERP is then keyed on the first
    /// seed keyword instead of the researched one.
    pub fn with_concurrent_enrichment(mut self, enabled: bool) -> Self {
        self.concurrent_enrichment = enabled;
        self
    }

    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.repository
    }

    /// Generate one article.
    ///
    /// Validation and storage errors come back as `Err`. Nothing is persisted
    /// for validation errors; a storage error after the request exists marks
    /// it `failed` and comes back as `AppError::Request`. Phase failures are
    /// not errors: a hard failure yields an outcome whose request is `failed`
    /// and which carries no article.
    pub async fn run(&self, input: GenerationInput) -> Result<GenerationOutcome> {
        let input = validate(input)?;

        let request = self
            .repository
            .create_request(NewContentRequest {
                title: input.topic.clone(),
                content_type: input.content_type.clone(),
                keywords: input.keywords.clone(),
                batch_id: input.batch_id,
            })
            .await?;
        let request_id = request.id;
        tracing::info!(%request_id, topic = %input.topic, "starting content generation");

        match self.execute(request_id, &input).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!(%request_id, "content generation aborted: {}", e);
                if let Err(mark) = self.repository.fail_request(request_id, e.to_string()).await {
                    tracing::error!(%request_id, "failed to mark request as failed: {}", mark);
                }
                Err(AppError::Request {
                    request_id,
                    source: Box::new(e),
                })
            }
        }
    }

    async fn execute(&self, request_id: Uuid, input: &GenerationInput) -> Result<GenerationOutcome> {
        let mut tracker = ProgressTracker::new();
        self.repository.update_request_progress(request_id, 0).await?;

        let (research, serp) = if self.concurrent_enrichment {
            self.enrich_concurrently(request_id, input, &mut tracker).await?
        } else {
            self.enrich_sequentially(request_id, input, &mut tracker).await?
        };

        let research = match research {
            Ok(research) => research,
            Err(message) => return self.abort(request_id, tracker, Phase::Research, message).await,
        };
        let primary_keyword = research.primary_keyword.trim().to_string();
        tracing::info!(
            %request_id,
            keyword = %primary_keyword,
            volume = ?research.search_volume,
            difficulty = ?research.difficulty,
            "primary keyword resolved"
        );
        self.repository
            .set_primary_keyword(request_id, primary_keyword.clone())
            .await?;

        // Content
        tracker.start(Phase::Content);
        self.report(request_id, &tracker, Phase::Content).await?;

        let params = ContentParams {
            topic: input.topic.clone(),
            primary_keyword: primary_keyword.clone(),
            keywords: merge_keywords(&[&input.keywords, &research.related_keywords]),
            content_type: input.content_type.clone(),
            tone: input.settings.tone.clone(),
            length: input.settings.length,
            audience: input.settings.audience.clone(),
            custom_instructions: input.settings.custom_instructions.clone(),
            serp,
        };

        let content = match self.services.generate_content(request_id, &params).await {
            Ok(content) if content.title.trim().is_empty() || content.body.trim().is_empty() => {
                let message = "content generation returned an empty article".to_string();
                return self.abort(request_id, tracker, Phase::Content, message).await;
            }
            Ok(content) => content,
            Err(e) => return self.abort(request_id, tracker, Phase::Content, e.to_string()).await,
        };
        tracker.advance(Phase::Content, 90);
        self.report(request_id, &tracker, Phase::Content).await?;

        let new_article = self
            .assemble_article(request_id, input, &primary_keyword, content)
            .await?;
        let article = self.repository.insert_article(new_article).await?;
        tracker.complete(Phase::Content);
        self.report(request_id, &tracker, Phase::Content).await?;
        tracing::info!(%request_id, slug = %article.slug, words = article.word_count, "article created");

        // Images
        let images = if input.settings.include_images {
            self.generate_images(request_id, &article, &primary_keyword, &input.settings, &mut tracker)
                .await?
        } else {
            tracker.skip(Phase::Images, "images disabled");
            self.report(request_id, &tracker, Phase::Images).await?;
            Vec::new()
        };

        self.repository.complete_request(request_id, article.id).await?;
        tracing::info!(%request_id, "content generation completed");

        Ok(GenerationOutcome {
            request: self.load_request(request_id).await?,
            article: Some(article),
            images,
            phases: tracker.phases(),
            error: None,
        })
    }

    async fn enrich_sequentially(
        &self,
        request_id: Uuid,
        input: &GenerationInput,
        tracker: &mut ProgressTracker,
    ) -> Result<(std::result::Result<KeywordResearch, String>, Option<SerpAnalysis>)> {
        tracker.start(Phase::Research);
        self.report(request_id, tracker, Phase::Research).await?;

        let research = self
            .services
            .research_keywords(request_id, &research_params(input))
            .await
            .map_err(|e| e.to_string())
            .and_then(check_research);
        let keyword = match &research {
            Ok(research) => research.primary_keyword.trim().to_string(),
            Err(_) => return Ok((research, None)),
        };
        tracker.complete(Phase::Research);
        self.report(request_id, tracker, Phase::Research).await?;

        tracker.start(Phase::Serp);
        self.report(request_id, tracker, Phase::Serp).await?;
        let serp = self
            .services
            .analyze_serp(request_id, &SerpParams { keyword })
            .await;
        let serp = self.resolve_serp(request_id, tracker, serp).await?;

        Ok((research, serp))
    }

    async fn enrich_concurrently(
        &self,
        request_id: Uuid,
        input: &GenerationInput,
        tracker: &mut ProgressTracker,
    ) -> Result<(std::result::Result<KeywordResearch, String>, Option<SerpAnalysis>)> {
        tracker.start(Phase::Research);
        self.report(request_id, tracker, Phase::Research).await?;
        tracker.start(Phase::Serp);
        self.report(request_id, tracker, Phase::Serp).await?;

        let research_params = research_params(input);
        let serp_params = SerpParams {
            keyword: input.keywords[0].clone(),
        };
        let (research, serp) = futures::future::join(
            self.services.research_keywords(request_id, &research_params),
            self.services.analyze_serp(request_id, &serp_params),
        )
        .await;

        let research = research.map_err(|e| e.to_string()).and_then(check_research);
        if research.is_ok() {
            tracker.complete(Phase::Research);
            self.report(request_id, tracker, Phase::Research).await?;
        }
        let serp = self.resolve_serp(request_id, tracker, serp).await?;

        Ok((research, serp))
    }

    async fn resolve_serp(
        &self,
        request_id: Uuid,
        tracker: &mut ProgressTracker,
        serp: Result<SerpAnalysis>,
    ) -> Result<Option<SerpAnalysis>> {
        let serp = match serp {
            Ok(analysis) => {
                tracker.complete(Phase::Serp);
                Some(analysis)
            }
            Err(e) => {
                tracing::warn!(%request_id, "serp analysis failed, continuing without it: {}", e);
                tracker.fail(Phase::Serp, e.to_string());
                None
            }
        };
        self.report(request_id, tracker, Phase::Serp).await?;
        Ok(serp)
    }

    async fn generate_images(
        &self,
        request_id: Uuid,
        article: &GeneratedArticle,
        keyword: &str,
        settings: &GenerationSettings,
        tracker: &mut ProgressTracker,
    ) -> Result<Vec<ArticleImage>> {
        tracker.start(Phase::Images);
        self.report(request_id, tracker, Phase::Images).await?;

        let params = ImageParams {
            title: article.title.clone(),
            keyword: keyword.to_string(),
            excerpt: article.excerpt.clone(),
            count: settings.image_count.max(1),
        };

        let generated = match self.services.generate_images(request_id, &params).await {
            Ok(generated) => generated,
            Err(e) => {
                tracing::warn!(%request_id, "image generation failed, keeping article without images: {}", e);
                tracker.fail(Phase::Images, e.to_string());
                self.report(request_id, tracker, Phase::Images).await?;
                return Ok(Vec::new());
            }
        };

        let new_images: Vec<NewArticleImage> = generated
            .images
            .into_iter()
            .filter(|image| !image.url.trim().is_empty())
            .map(|image| NewArticleImage {
                url: image.url,
                alt_text: image.alt_text.or_else(|| Some(article.title.clone())),
                prompt: image.prompt,
            })
            .collect();

        let images = match self.repository.insert_images(article.id, new_images).await {
            Ok(_) => {
                tracker.complete(Phase::Images);
                self.repository.list_images(article.id).await?
            }
            Err(e) => {
                tracing::warn!(%request_id, "failed to store generated images: {}", e);
                tracker.fail(Phase::Images, e.to_string());
                Vec::new()
            }
        };
        self.report(request_id, tracker, Phase::Images).await?;

        Ok(images)
    }

    async fn assemble_article(
        &self,
        request_id: Uuid,
        input: &GenerationInput,
        primary_keyword: &str,
        content: GeneratedContent,
    ) -> Result<NewArticle> {
        let title = content.title.trim().to_string();
        let body = content.body.trim().to_string();

        let mut slug = slugify(&title);
        if self.repository.slug_exists(&slug).await? {
            let suffix = request_id.simple().to_string();
            slug = suffixed_slug(&slug, &suffix[..8]);
        }

        let excerpt = content
            .excerpt
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| derive_excerpt(&body));
        let words = word_count(&body);
        let meta_description = content
            .meta_description
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        Ok(NewArticle {
            request_id,
            seo_score: seo_score(
                &title,
                &excerpt,
                &body,
                meta_description.as_deref(),
                primary_keyword,
            ),
            quality_score: quality_score(&body, input.settings.length),
            keywords: merge_keywords(&[
                &[primary_keyword.to_string()],
                &input.keywords,
                &content.keywords,
            ]),
            word_count: words,
            reading_time_minutes: reading_time_minutes(words),
            category: content.category.filter(|c| !c.trim().is_empty()),
            meta_title: content.meta_title.filter(|m| !m.trim().is_empty()),
            meta_description,
            title,
            slug,
            body,
            excerpt,
        })
    }

    /// Record a hard failure. The request ends `failed` and no article exists.
    async fn abort(
        &self,
        request_id: Uuid,
        mut tracker: ProgressTracker,
        phase: Phase,
        message: String,
    ) -> Result<GenerationOutcome> {
        let message = format!("{} phase failed: {}", phase, message);
        tracing::error!(%request_id, "{}", message);

        tracker.fail(phase, message.clone());
        self.report(request_id, &tracker, phase).await?;
        self.repository
            .fail_request(request_id, message.clone())
            .await?;

        Ok(GenerationOutcome {
            request: self.load_request(request_id).await?,
            article: None,
            images: Vec::new(),
            phases: tracker.phases(),
            error: Some(message),
        })
    }

    async fn report(&self, request_id: Uuid, tracker: &ProgressTracker, phase: Phase) -> Result<()> {
        let event = tracker.event(request_id, phase);
        tracing::debug!(
            %request_id,
            phase = %phase,
            status = %event.status,
            overall = event.overall,
            "progress"
        );
        self.repository
            .update_request_progress(request_id, event.overall)
            .await?;
        if let Some(tx) = &self.progress_tx {
            // Receiver gone just means nobody is watching
            let _ = tx.send(event);
        }
        Ok(())
    }

    async fn load_request(&self, request_id: Uuid) -> Result<ContentRequest> {
        self.repository
            .get_request(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("content request {}", request_id)))
    }
}

fn validate(mut input: GenerationInput) -> Result<GenerationInput> {
    input.topic = input.topic.trim().to_string();
    if input.topic.is_empty() {
        return Err(AppError::Validation("topic is required".to_string()));
    }

    input.content_type = input.content_type.trim().to_string();
    if input.content_type.is_empty() {
        return Err(AppError::Validation("content type is required".to_string()));
    }

    if input.settings.length == 0 {
        return Err(AppError::Validation("length must be greater than zero".to_string()));
    }

    input.keywords = merge_keywords(&[&input.keywords]);
    if input.keywords.is_empty() {
        input.keywords.push(input.topic.to_lowercase());
    }

    Ok(input)
}

fn research_params(input: &GenerationInput) -> KeywordResearchParams {
    KeywordResearchParams {
        topic: input.topic.clone(),
        seed_keywords: input.keywords.clone(),
    }
}

fn check_research(research: KeywordResearch) -> std::result::Result<KeywordResearch, String> {
    if research.primary_keyword.trim().is_empty() {
        Err("keyword research returned no primary keyword".to_string())
    } else {
        Ok(research)
    }
}

/// Trimmed, non-empty, de-duplicated case-insensitively, first spelling wins.
fn merge_keywords(lists: &[&[String]]) -> Vec<String> {
    let mut seen = HashSet::new();
    lists
        .iter()
        .flat_map(|list| list.iter())
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.to_lowercase()))
        .map(str::to_string)
        .collect()
}
