use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    #[default]
    Draft,
    Published,
    Scheduled,
    Archived,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
            ArticleStatus::Scheduled => "scheduled",
            ArticleStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ArticleStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(ArticleStatus::Draft),
            "published" => Ok(ArticleStatus::Published),
            "scheduled" => Ok(ArticleStatus::Scheduled),
            "archived" => Ok(ArticleStatus::Archived),
            _ => Err(ParseEnumError::new("article status", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    NeedsRevision,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::NeedsRevision => "needs_revision",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            "needs_revision" => Ok(ReviewStatus::NeedsRevision),
            _ => Err(ParseEnumError::new("review status", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArticle {
    pub id: Uuid,
    pub request_id: Uuid,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub excerpt: String,
    pub word_count: u32,
    pub reading_time_minutes: u32,
    pub quality_score: u8,
    pub seo_score: u8,
    pub keywords: Vec<String>,
    pub category: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub status: ArticleStatus,
    pub review_status: ReviewStatus,
    pub view_count: u64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub request_id: Uuid,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub excerpt: String,
    pub word_count: u32,
    pub reading_time_minutes: u32,
    pub quality_score: u8,
    pub seo_score: u8,
    pub keywords: Vec<String>,
    pub category: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleImage {
    pub id: i64,
    pub article_id: Uuid,
    pub url: String,
    pub alt_text: Option<String>,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewArticleImage {
    pub url: String,
    pub alt_text: Option<String>,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    PublishedAt,
    Title,
    ViewCount,
    SeoScore,
    QualityScore,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::PublishedAt => "published_at",
            SortField::Title => "title",
            SortField::ViewCount => "view_count",
            SortField::SeoScore => "seo_score",
            SortField::QualityScore => "quality_score",
        }
    }
}

impl FromStr for SortField {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "created" | "created_at" => Ok(SortField::CreatedAt),
            "updated" | "updated_at" => Ok(SortField::UpdatedAt),
            "published" | "published_at" => Ok(SortField::PublishedAt),
            "title" => Ok(SortField::Title),
            "views" | "view_count" => Ok(SortField::ViewCount),
            "seo" | "seo_score" => Ok(SortField::SeoScore),
            "quality" | "quality_score" => Ok(SortField::QualityScore),
            _ => Err(ParseEnumError::new("sort field", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Filter for listing generated articles. Every field is optional; the
/// default lists everything newest first.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub status: Option<ArticleStatus>,
    pub category: Option<String>,
    pub keyword: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub sort: SortField,
    pub direction: SortDirection,
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_status_accepts_dashed_form() {
        assert_eq!(
            "needs-revision".parse::<ReviewStatus>(),
            Ok(ReviewStatus::NeedsRevision)
        );
    }

    #[test]
    fn sort_field_aliases() {
        assert_eq!("views".parse::<SortField>(), Ok(SortField::ViewCount));
        assert_eq!("seo".parse::<SortField>(), Ok(SortField::SeoScore));
        assert!("rank".parse::<SortField>().is_err());
    }

    #[test]
    fn default_filter_sorts_newest_first() {
        let filter = ArticleFilter::default();
        assert_eq!(filter.sort.column(), "created_at");
        assert_eq!(filter.direction.keyword(), "DESC");
    }
}
