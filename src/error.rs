use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{function} failed: {message}")]
    FunctionApi { function: String, message: String },

    #[error("Claude API error: {0}")]
    ClaudeApi(String),

    #[error("Email API error: {0}")]
    EmailApi(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// An error raised after the request row was created. The request has
    /// been marked `failed` by the time this is returned.
    #[error("request {request_id}: {source}")]
    Request {
        request_id: Uuid,
        #[source]
        source: Box<AppError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Id of the content request this error belongs to, if one was created.
    pub fn request_id(&self) -> Option<Uuid> {
        match self {
            AppError::Request { request_id, .. } => Some(*request_id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
