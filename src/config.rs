use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::pipeline::GenerationSettings;
use crate::services::DEFAULT_EMAIL_API_URL;

const FUNCTIONS_KEY_ENV: &str = "CONTENT_FORGE_FUNCTIONS_KEY";
const CLAUDE_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const EMAIL_KEY_ENV: &str = "CONTENT_FORGE_EMAIL_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentBackend {
    /// The hosted `generate-content` function.
    #[default]
    Functions,
    /// The Anthropic Messages API, called directly.
    Claude,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_email_api_url")]
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: String,
    /// Where batch summaries go. No address, no email.
    pub notify_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_functions_url")]
    pub functions_url: String,
    pub functions_key: Option<String>,

    #[serde(default)]
    pub content_backend: ContentBackend,
    pub claude_api_key: Option<String>,
    pub claude_model: Option<String>,

    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    #[serde(default)]
    pub concurrent_enrichment: bool,

    #[serde(default = "default_content_type")]
    pub default_content_type: String,
    #[serde(default = "default_tone")]
    pub default_tone: String,
    #[serde(default = "default_length")]
    pub default_length: u32,
    #[serde(default = "default_include_images")]
    pub include_images: bool,
    #[serde(default = "default_image_count")]
    pub image_count: u8,

    pub email: Option<EmailConfig>,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("content-forge");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("content.db").to_string_lossy().to_string()
}

fn default_functions_url() -> String {
    "http://localhost:54321/functions/v1".to_string()
}

fn default_email_api_url() -> String {
    DEFAULT_EMAIL_API_URL.to_string()
}

fn default_batch_delay_ms() -> u64 {
    2000
}

fn default_content_type() -> String {
    "blog_post".to_string()
}

fn default_tone() -> String {
    "professional".to_string()
}

fn default_length() -> u32 {
    1500
}

fn default_include_images() -> bool {
    true
}

fn default_image_count() -> u8 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            functions_url: default_functions_url(),
            functions_key: None,
            content_backend: ContentBackend::default(),
            claude_api_key: None,
            claude_model: None,
            batch_delay_ms: default_batch_delay_ms(),
            concurrent_enrichment: false,
            default_content_type: default_content_type(),
            default_tone: default_tone(),
            default_length: default_length(),
            include_images: default_include_images(),
            image_count: default_image_count(),
            email: None,
        }
    }
}

impl Config {
    /// Load from the default location, writing a default file on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            config
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("content-forge")
            .join("config.toml")
    }

    /// Secrets may come from the environment instead of the file.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var(FUNCTIONS_KEY_ENV).filter(|k| !k.is_empty()) {
            self.functions_key = Some(key);
        }
        if let Some(key) = var(CLAUDE_KEY_ENV).filter(|k| !k.is_empty()) {
            self.claude_api_key = Some(key);
        }
        if let Some(key) = var(EMAIL_KEY_ENV).filter(|k| !k.is_empty()) {
            if let Some(email) = self.email.as_mut() {
                email.api_key = Some(key);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.content_backend == ContentBackend::Claude && self.claude_api_key.is_none() {
            return Err(AppError::Config(format!(
                "content_backend = \"claude\" needs claude_api_key or {}",
                CLAUDE_KEY_ENV
            )));
        }
        if self.default_length == 0 {
            return Err(AppError::Config("default_length must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            tone: self.default_tone.clone(),
            length: self.default_length,
            audience: None,
            custom_instructions: None,
            include_images: self.include_images,
            image_count: self.image_count,
        }
    }
}
