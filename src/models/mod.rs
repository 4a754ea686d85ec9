mod article;
mod request;

pub use article::{
    ArticleFilter, ArticleImage, ArticleStatus, GeneratedArticle, NewArticle, NewArticleImage,
    ReviewStatus, SortDirection, SortField,
};
pub use request::{ContentRequest, NewContentRequest, RequestStatus};

/// Returned when a stored or user-supplied enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
