//! Request and response payloads for the four generation phases.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordResearchParams {
    pub topic: String,
    pub seed_keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordResearch {
    pub primary_keyword: String,
    #[serde(default)]
    pub related_keywords: Vec<String>,
    pub search_volume: Option<u64>,
    pub difficulty: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerpParams {
    pub keyword: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerpAnalysis {
    #[serde(default)]
    pub top_results: Vec<SerpResult>,
    #[serde(default)]
    pub common_headings: Vec<String>,
    pub average_word_count: Option<u32>,
    #[serde(default)]
    pub content_gaps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerpResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentParams {
    pub topic: String,
    pub primary_keyword: String,
    pub keywords: Vec<String>,
    pub content_type: String,
    pub tone: String,
    /// Target length in words.
    pub length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serp: Option<SerpAnalysis>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub title: String,
    #[serde(alias = "content")]
    pub body: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageParams {
    pub title: String,
    pub keyword: String,
    pub excerpt: String,
    pub count: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratedImages {
    #[serde(default)]
    pub images: Vec<GeneratedImage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub url: String,
    #[serde(default, alias = "alt")]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}
