//! Heuristic SEO and quality scores for generated articles.
//!
//! Both scores are 0–100 and purely local: they only look at the text the
//! content phase returned and the primary keyword resolved during research.

use std::sync::OnceLock;

use regex::Regex;

use super::text::{strip_markdown, word_count};

fn heading_regex() -> &'static Regex {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    HEADING.get_or_init(|| Regex::new(r"(?m)^#{1,6}\s+\S").expect("heading pattern is valid"))
}

fn heading_count(body: &str) -> usize {
    heading_regex().find_iter(body).count()
}

fn paragraph_count(body: &str) -> usize {
    body.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.starts_with('#'))
        .count()
}

fn contains_keyword(text: &str, keyword: &str) -> bool {
    !keyword.is_empty() && text.to_lowercase().contains(keyword)
}

/// Percentage of body words taken up by occurrences of the keyword phrase.
fn keyword_density(body: &str, keyword: &str) -> f64 {
    let total = word_count(body);
    if total == 0 || keyword.is_empty() {
        return 0.0;
    }
    let occurrences = body.to_lowercase().matches(keyword).count();
    let phrase_len = keyword.split_whitespace().count().max(1);
    (occurrences * phrase_len) as f64 / f64::from(total) * 100.0
}

pub fn seo_score(
    title: &str,
    excerpt: &str,
    body: &str,
    meta_description: Option<&str>,
    primary_keyword: &str,
) -> u8 {
    let keyword = primary_keyword.trim().to_lowercase();
    let mut score = 0u32;

    if contains_keyword(title, &keyword) {
        score += 25;
    }
    if contains_keyword(excerpt, &keyword) {
        score += 15;
    }

    let opening: String = strip_markdown(body)
        .split_whitespace()
        .take(100)
        .collect::<Vec<_>>()
        .join(" ");
    if contains_keyword(&opening, &keyword) {
        score += 15;
    }

    let density = keyword_density(body, &keyword);
    if (0.5..=2.5).contains(&density) {
        score += 20;
    } else if density > 0.0 {
        score += 10;
    }

    match meta_description.map(|m| m.trim().chars().count()) {
        Some(len) if (120..=160).contains(&len) => score += 10,
        Some(len) if len > 0 => score += 5,
        _ => {}
    }

    if heading_count(body) >= 2 {
        score += 15;
    }

    score.min(100) as u8
}

pub fn quality_score(body: &str, target_words: u32) -> u8 {
    let words = word_count(body);
    if words == 0 {
        return 0;
    }

    let target = target_words.max(1);
    let length_ratio = (f64::from(words) / f64::from(target)).min(1.0);
    let mut score = 40.0 * length_ratio;

    let paragraphs = paragraph_count(body);
    score += 20.0 * (paragraphs.min(5) as f64 / 5.0);

    score += match heading_count(body) {
        0 => 0.0,
        1 => 10.0,
        _ => 20.0,
    };

    let sentences = strip_markdown(body)
        .split(['.', '!', '?'])
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .count()
        .max(1);
    let average = f64::from(words) / sentences as f64;
    score += if (10.0..=25.0).contains(&average) {
        20.0
    } else {
        10.0
    };

    score.round().min(100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_body() -> String {
        let sentence = "Teams adopting rust ai tooling see faster and safer inference pipelines today.";
        let paragraph = format!("{} {}", sentence, sentence);
        format!(
            "# Rust AI\n\n{}\n\n## Why it matters\n\n{}\n\n{}\n\n## Getting started\n\n{}\n\n{}",
            paragraph, paragraph, paragraph, paragraph, paragraph
        )
    }

    #[test]
    fn empty_body_scores_zero_quality() {
        assert_eq!(quality_score("", 1000), 0);
    }

    #[test]
    fn well_structured_body_meets_quality_bar() {
        let body = sample_body();
        let score = quality_score(&body, word_count(&body));
        assert_eq!(score, 100);
    }

    #[test]
    fn short_body_is_penalised_against_target() {
        let body = sample_body();
        let full = quality_score(&body, word_count(&body));
        let short = quality_score(&body, word_count(&body) * 4);
        assert!(short < full);
    }

    #[test]
    fn seo_rewards_keyword_placement() {
        let body = sample_body();
        let meta = "x".repeat(140);
        let optimised = seo_score(
            "Rust AI tooling for production",
            "Why rust ai matters",
            &body,
            Some(&meta),
            "rust ai",
        );
        let unrelated = seo_score("Gardening", "Tomatoes", "Plant in spring.", None, "rust ai");
        assert!(optimised > unrelated);
        assert_eq!(unrelated, 0);
        assert!(optimised <= 100);
    }

    #[test]
    fn keyword_stuffing_loses_density_points() {
        let stuffed = "rust ai ".repeat(50);
        let normal = sample_body();
        assert!(keyword_density(&stuffed, "rust ai") > 2.5);
        let density = keyword_density(&normal, "rust ai");
        assert!(density > 0.0);
    }
}
