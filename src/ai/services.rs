use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::services::FunctionsClient;

use super::types::{
    ContentParams, GeneratedContent, GeneratedImages, ImageParams, KeywordResearch,
    KeywordResearchParams, SerpAnalysis, SerpParams,
};
use super::writer::Writer;

pub const KEYWORD_RESEARCH_FN: &str = "keyword-research";
pub const SERP_ANALYSIS_FN: &str = "serp-analysis";
pub const GENERATE_CONTENT_FN: &str = "generate-content";
pub const GENERATE_IMAGES_FN: &str = "generate-images";

/// The remote operations behind each generation phase.
#[async_trait]
pub trait ContentServices: Send + Sync {
    async fn research_keywords(
        &self,
        request_id: Uuid,
        params: &KeywordResearchParams,
    ) -> Result<KeywordResearch>;

    async fn analyze_serp(&self, request_id: Uuid, params: &SerpParams) -> Result<SerpAnalysis>;

    async fn generate_content(
        &self,
        request_id: Uuid,
        params: &ContentParams,
    ) -> Result<GeneratedContent>;

    async fn generate_images(
        &self,
        request_id: Uuid,
        params: &ImageParams,
    ) -> Result<GeneratedImages>;
}

/// Production services: hosted functions, with content optionally written
/// by Claude directly.
pub struct RemoteServices {
    functions: FunctionsClient,
    writer: Option<Writer>,
}

impl RemoteServices {
    pub fn new(functions: FunctionsClient, writer: Option<Writer>) -> Self {
        Self { functions, writer }
    }
}

#[async_trait]
impl ContentServices for RemoteServices {
    async fn research_keywords(
        &self,
        request_id: Uuid,
        params: &KeywordResearchParams,
    ) -> Result<KeywordResearch> {
        self.functions
            .invoke(KEYWORD_RESEARCH_FN, request_id, params)
            .await
    }

    async fn analyze_serp(&self, request_id: Uuid, params: &SerpParams) -> Result<SerpAnalysis> {
        self.functions
            .invoke(SERP_ANALYSIS_FN, request_id, params)
            .await
    }

    async fn generate_content(
        &self,
        request_id: Uuid,
        params: &ContentParams,
    ) -> Result<GeneratedContent> {
        match &self.writer {
            Some(writer) => {
                tracing::debug!(%request_id, model = writer.model_version(), "writing with claude");
                writer.generate_article(params).await
            }
            None => {
                self.functions
                    .invoke(GENERATE_CONTENT_FN, request_id, params)
                    .await
            }
        }
    }

    async fn generate_images(
        &self,
        request_id: Uuid,
        params: &ImageParams,
    ) -> Result<GeneratedImages> {
        self.functions
            .invoke(GENERATE_IMAGES_FN, request_id, params)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn routes_each_phase_to_its_function() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/keyword-research"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"primaryKeyword": "ai consulting", "relatedKeywords": ["ai advisory"]}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/generate-content"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"title": "AI consulting 101", "content": "Body"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let services = RemoteServices::new(FunctionsClient::new(&server.uri(), None).unwrap(), None);
        let request_id = Uuid::new_v4();

        let research = services
            .research_keywords(
                request_id,
                &KeywordResearchParams {
                    topic: "AI consulting".to_string(),
                    seed_keywords: vec!["ai consulting".to_string()],
                },
            )
            .await
            .unwrap();
        assert_eq!(research.primary_keyword, "ai consulting");
        assert_eq!(research.related_keywords, vec!["ai advisory".to_string()]);

        let content = services
            .generate_content(
                request_id,
                &ContentParams {
                    topic: "AI consulting".to_string(),
                    primary_keyword: research.primary_keyword,
                    keywords: vec![],
                    content_type: "blog_post".to_string(),
                    tone: "professional".to_string(),
                    length: 800,
                    audience: None,
                    custom_instructions: None,
                    serp: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(content.title, "AI consulting 101");
    }
}
