use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::types::{ContentParams, GeneratedContent};

pub const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const CLAUDE_MODEL: &str = "claude-3-5-haiku-20241022";

const SYSTEM_PROMPT: &str = r#"You are an expert content writer for an AI consulting company.
Write original, well-structured articles in markdown with descriptive ## headings.
Respond with a single JSON object and nothing else, using the keys:
"title", "body", "excerpt", "metaTitle", "metaDescription", "category", "keywords".
"body" holds the markdown article. "metaDescription" should be 120-160 characters."#;

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    system: Option<String>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    content_type: String,
    text: Option<String>,
}

/// Generates article content directly through the Anthropic Messages API.
pub struct Writer {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl Writer {
    pub fn new(api_key: String, model: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(180)).build()?;
        Ok(Self {
            client,
            api_key,
            api_url: CLAUDE_API_URL.to_string(),
            model: model.unwrap_or_else(|| CLAUDE_MODEL.to_string()),
        })
    }

    #[cfg(test)]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub async fn generate_article(&self, params: &ContentParams) -> Result<GeneratedContent> {
        let request = MessageRequest {
            model: self.model.clone(),
            // Roughly 1.5 tokens per word plus room for the JSON wrapper
            max_tokens: (params.length.saturating_mul(2)).clamp(1024, 8192),
            messages: vec![Message {
                role: "user".to_string(),
                content: build_prompt(params),
            }],
            system: Some(SYSTEM_PROMPT.to_string()),
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::ClaudeApi(format!("API error: {}", error_text)));
        }

        let message_response: MessageResponse = response.json().await?;

        let text = message_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        parse_article(&text)
    }

    pub fn model_version(&self) -> &str {
        &self.model
    }
}

fn build_prompt(params: &ContentParams) -> String {
    let mut prompt = format!(
        "Write a {} about \"{}\".\n\nPrimary keyword: {}\nSecondary keywords: {}\nTone: {}\nTarget length: about {} words\n",
        params.content_type.replace('_', " "),
        params.topic,
        params.primary_keyword,
        params.keywords.join(", "),
        params.tone,
        params.length,
    );

    if let Some(audience) = &params.audience {
        prompt.push_str(&format!("Audience: {}\n", audience));
    }

    if let Some(serp) = &params.serp {
        if !serp.common_headings.is_empty() {
            prompt.push_str(&format!(
                "\nCompeting articles commonly cover: {}\n",
                serp.common_headings.join("; ")
            ));
        }
        if !serp.content_gaps.is_empty() {
            prompt.push_str(&format!(
                "Gaps competitors miss: {}\n",
                serp.content_gaps.join("; ")
            ));
        }
        if let Some(words) = serp.average_word_count {
            prompt.push_str(&format!("Top results average {} words.\n", words));
        }
    }

    if let Some(instructions) = &params.custom_instructions {
        prompt.push_str(&format!("\nAdditional instructions:\n{}\n", instructions));
    }

    prompt
}

/// The model sometimes wraps the object in prose or a code fence.
fn parse_article(text: &str) -> Result<GeneratedContent> {
    let start = text.find('{');
    let end = text.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => {
            Ok(serde_json::from_str(&text[start..=end])?)
        }
        _ => Err(AppError::ClaudeApi(
            "response did not contain a JSON article".to_string(),
        )),
    }
}
