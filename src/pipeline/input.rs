//! CSV batch input.
//!
//! Header row required. `topic` (or `title`) is the only mandatory column;
//! `keywords`, `content_type`, `length`, `tone`, `audience` and
//! `instructions` are optional per-row overrides.

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRow {
    /// 1-based position among data rows (header excluded).
    pub row: usize,
    pub topic: String,
    pub keywords: Vec<String>,
    pub content_type: Option<String>,
    pub length: Option<u32>,
    pub tone: Option<String>,
    pub audience: Option<String>,
    pub instructions: Option<String>,
    /// Set when a cell could not be parsed. The row is reported as failed
    /// instead of being generated.
    pub invalid: Option<String>,
}

struct Columns {
    topic: usize,
    keywords: Option<usize>,
    content_type: Option<usize>,
    length: Option<usize>,
    tone: Option<usize>,
    audience: Option<usize>,
    instructions: Option<usize>,
}

impl Columns {
    fn from_header(header: &[String]) -> Result<Self> {
        let names: Vec<String> = header
            .iter()
            .map(|h| h.trim().to_ascii_lowercase().replace([' ', '-'], "_"))
            .collect();
        let find = |candidates: &[&str]| names.iter().position(|n| candidates.contains(&n.as_str()));

        let topic = find(&["topic", "title"]).ok_or_else(|| {
            AppError::Validation("batch file needs a \"topic\" or \"title\" column".to_string())
        })?;

        Ok(Self {
            topic,
            keywords: find(&["keywords", "keyword"]),
            content_type: find(&["content_type", "type"]),
            length: find(&["length", "word_count", "words"]),
            tone: find(&["tone", "style"]),
            audience: find(&["audience", "target_audience"]),
            instructions: find(&["instructions", "custom_instructions"]),
        })
    }
}

pub fn parse_batch_csv(text: &str) -> Result<Vec<BatchRow>> {
    let mut records = parse_records(text)?.into_iter();
    let header = records
        .next()
        .ok_or_else(|| AppError::Validation("batch file is empty".to_string()))?;
    let columns = Columns::from_header(&header)?;

    let rows = records
        .enumerate()
        .map(|(i, record)| {
            let row = i + 1;
            let cell = |idx: Option<usize>| {
                idx.and_then(|idx| record.get(idx))
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            };

            let mut invalid = None;
            let length = cell(columns.length).and_then(|raw| match raw.parse::<u32>() {
                Ok(length) => Some(length),
                Err(_) => {
                    invalid = Some(format!("invalid length {:?}", raw));
                    None
                }
            });

            BatchRow {
                row,
                topic: cell(Some(columns.topic)).unwrap_or_default(),
                keywords: cell(columns.keywords)
                    .map(|raw| split_keywords(&raw))
                    .unwrap_or_default(),
                content_type: cell(columns.content_type),
                length,
                tone: cell(columns.tone),
                audience: cell(columns.audience),
                instructions: cell(columns.instructions),
                invalid,
            }
        })
        .collect();
    Ok(rows)
}

fn split_keywords(raw: &str) -> Vec<String> {
    raw.split([';', '|', ','])
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits CSV text into records, honouring quoted fields with `""` escapes
/// and embedded separators or newlines. Blank lines are dropped.
fn parse_records(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.trim_start_matches('\u{feff}').chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(anyhow::anyhow!("unterminated quoted field in batch file").into());
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records.retain(|r: &Vec<String>| r.iter().any(|f| !f.trim().is_empty()));
    Ok(records)
}
