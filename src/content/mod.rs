mod scoring;
mod text;

pub use scoring::{quality_score, seo_score};
pub use text::{derive_excerpt, reading_time_minutes, slugify, suffixed_slug, word_count};
