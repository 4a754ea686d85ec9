use std::sync::OnceLock;

use regex::Regex;

const MAX_SLUG_LEN: usize = 80;
const EXCERPT_LEN: usize = 160;
const WORDS_PER_MINUTE: u32 = 200;

fn link_regex() -> &'static Regex {
    static LINK: OnceLock<Regex> = OnceLock::new();
    LINK.get_or_init(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("link pattern is valid"))
}

fn emphasis_regex() -> &'static Regex {
    static EMPHASIS: OnceLock<Regex> = OnceLock::new();
    EMPHASIS.get_or_init(|| Regex::new(r"[*_`~]+").expect("emphasis pattern is valid"))
}

/// Lowercase ASCII slug: alphanumerics kept, every other run becomes one `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    truncate_slug(&mut slug, MAX_SLUG_LEN);

    if slug.is_empty() {
        "article".to_string()
    } else {
        slug
    }
}

/// Appends `-{suffix}` to a slug, shortening the base so the result still
/// fits the slug length cap.
pub fn suffixed_slug(slug: &str, suffix: &str) -> String {
    let mut base = slug.to_string();
    truncate_slug(&mut base, MAX_SLUG_LEN.saturating_sub(suffix.len() + 1));
    if base.is_empty() {
        return suffix.to_string();
    }
    format!("{}-{}", base, suffix)
}

// Slugs are ASCII, so byte truncation is safe.
fn truncate_slug(slug: &mut String, max: usize) {
    if slug.len() > max {
        slug.truncate(max);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
}

/// Counts whitespace-separated tokens that contain at least one letter or
/// digit, so bare markdown markers are not words.
pub fn word_count(body: &str) -> u32 {
    body.split_whitespace()
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .count() as u32
}

pub fn reading_time_minutes(words: u32) -> u32 {
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}

pub(crate) fn strip_markdown(text: &str) -> String {
    let text = link_regex().replace_all(text, "$1");
    let text = emphasis_regex().replace_all(&text, "");
    text.trim_start_matches(|c: char| c == '#' || c == '>' || c.is_whitespace())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds an excerpt from the first prose paragraph of a markdown body.
pub fn derive_excerpt(body: &str) -> String {
    let paragraph = body
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty() && !p.starts_with('#'))
        .unwrap_or("");

    let plain = strip_markdown(paragraph);
    if plain.chars().count() <= EXCERPT_LEN {
        return plain;
    }

    let cut = plain
        .char_indices()
        .nth(EXCERPT_LEN)
        .map(|(idx, _)| idx)
        .unwrap_or(plain.len());
    let head = &plain[..cut];
    let head = match head.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => &head[..idx],
        _ => head,
    };

    format!("{}...", head.trim_end_matches(|c: char| c.is_ascii_punctuation()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(
            slugify("  AI Strategy: 10 Tips for 2025!  "),
            "ai-strategy-10-tips-for-2025"
        );
        assert_eq!(slugify("Café -- déjà vu"), "caf-d-j-vu");
        assert_eq!(slugify("!!!"), "article");
    }

    #[test]
    fn slugify_caps_length_without_trailing_dash() {
        let title = "word ".repeat(40);
        let slug = slugify(&title);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn suffixed_slug_stays_within_cap() {
        let long = slugify(&"collisions ".repeat(20));
        assert_eq!(long.len(), MAX_SLUG_LEN);

        let slug = suffixed_slug(&long, "1a2b3c4d");
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(slug.ends_with("-1a2b3c4d"));
        assert!(!slug.contains("--"));

        assert_eq!(suffixed_slug("short-title", "1a2b3c4d"), "short-title-1a2b3c4d");
    }

    #[test]
    fn word_count_ignores_markdown_markers() {
        assert_eq!(word_count("## Heading\n\n- one two\n* three"), 4);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn reading_time_rounds_up_with_minimum() {
        assert_eq!(reading_time_minutes(0), 1);
        assert_eq!(reading_time_minutes(200), 1);
        assert_eq!(reading_time_minutes(201), 2);
        assert_eq!(reading_time_minutes(1500), 8);
    }

    #[test]
    fn excerpt_skips_headings_and_strips_markup() {
        let body = "# Title\n\nRead **the** [guide](https://x.io) on `agents`.\n\nSecond.";
        assert_eq!(derive_excerpt(body), "Read the guide on agents.");
    }

    #[test]
    fn long_excerpt_is_cut_at_word_boundary() {
        let body = "lorem ipsum ".repeat(30);
        let excerpt = derive_excerpt(&body);
        assert!(excerpt.ends_with("..."));
        assert!(excerpt.chars().count() <= EXCERPT_LEN + 3);
        let without_dots = excerpt.trim_end_matches("...");
        assert!(without_dots.ends_with("lorem") || without_dots.ends_with("ipsum"));
    }
}
