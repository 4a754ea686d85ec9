use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use super::input::BatchRow;
use super::orchestrator::{GenerationInput, GenerationSettings, Orchestrator};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Pause between rows to stay under upstream rate limits.
    pub delay: Duration,
    pub content_type: String,
    pub settings: GenerationSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub row: usize,
    pub topic: String,
    pub request_id: Uuid,
    pub article_id: Uuid,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchRowError {
    pub row: usize,
    pub topic: String,
    pub request_id: Option<Uuid>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub completed: Vec<BatchItem>,
    pub errors: Vec<BatchRowError>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.completed.len()
    }

    pub fn failure_count(&self) -> usize {
        self.errors.len()
    }

    /// Downloadable summary, one line per input row in row order.
    pub fn to_csv(&self) -> String {
        let mut lines: Vec<(usize, String)> = self
            .completed
            .iter()
            .map(|item| {
                (
                    item.row,
                    csv_line(&[
                        &item.row.to_string(),
                        &item.topic,
                        "completed",
                        &item.request_id.to_string(),
                        &item.article_id.to_string(),
                        &item.slug,
                        "",
                    ]),
                )
            })
            .chain(self.errors.iter().map(|error| {
                (
                    error.row,
                    csv_line(&[
                        &error.row.to_string(),
                        &error.topic,
                        "failed",
                        &error
                            .request_id
                            .map(|id| id.to_string())
                            .unwrap_or_default(),
                        "",
                        "",
                        &error.message,
                    ]),
                )
            }))
            .collect();
        lines.sort_by_key(|(row, _)| *row);

        let mut out = String::from("row,topic,status,request_id,article_id,slug,error\n");
        for (_, line) in lines {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    pub fn to_html(&self) -> String {
        let mut html = format!(
            "<h2>Content batch {}</h2><p>{} completed, {} failed.</p>",
            self.batch_id,
            self.success_count(),
            self.failure_count()
        );
        if !self.errors.is_empty() {
            html.push_str("<ul>");
            for error in &self.errors {
                html.push_str(&format!(
                    "<li>Row {} ({}): {}</li>",
                    error.row,
                    escape_html(&error.topic),
                    escape_html(&error.message)
                ));
            }
            html.push_str("</ul>");
        }
        html
    }
}

fn csv_line(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| {
            if field.contains([',', '"', '\n', '\r']) {
                format!("\"{}\"", field.replace('"', "\"\""))
            } else {
                field.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl Orchestrator {
    /// Run every row through the pipeline, one after another. A failing row
    /// is recorded and the batch moves on.
    pub async fn run_batch(&self, rows: Vec<BatchRow>, options: &BatchOptions) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let total = rows.len();
        let mut report = BatchReport {
            batch_id,
            completed: Vec::new(),
            errors: Vec::new(),
        };

        tracing::info!(%batch_id, rows = total, "starting batch");

        for (index, row) in rows.into_iter().enumerate() {
            if index > 0 && !options.delay.is_zero() {
                tokio::time::sleep(options.delay).await;
            }

            tracing::info!(%batch_id, row = row.row, topic = %row.topic, "batch row {}/{}", index + 1, total);
            let topic = row.topic.clone();
            let row_number = row.row;

            if let Some(problem) = &row.invalid {
                tracing::warn!(%batch_id, row = row_number, "skipping invalid batch row: {}", problem);
                report.errors.push(BatchRowError {
                    row: row_number,
                    topic,
                    request_id: None,
                    message: problem.clone(),
                });
                continue;
            }

            match self.run(row_input(row, batch_id, options)).await {
                Ok(outcome) => match (&outcome.article, outcome.is_success()) {
                    (Some(article), true) => report.completed.push(BatchItem {
                        row: row_number,
                        topic,
                        request_id: outcome.request.id,
                        article_id: article.id,
                        slug: article.slug.clone(),
                    }),
                    _ => report.errors.push(BatchRowError {
                        row: row_number,
                        topic,
                        request_id: Some(outcome.request.id),
                        message: outcome
                            .error
                            .unwrap_or_else(|| "generation did not complete".to_string()),
                    }),
                },
                Err(e) => {
                    tracing::warn!(%batch_id, row = row_number, "batch row failed: {}", e);
                    report.errors.push(BatchRowError {
                        row: row_number,
                        topic,
                        request_id: e.request_id(),
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            %batch_id,
            completed = report.success_count(),
            failed = report.failure_count(),
            "batch finished"
        );
        report
    }
}

fn row_input(row: BatchRow, batch_id: Uuid, options: &BatchOptions) -> GenerationInput {
    let mut settings = options.settings.clone();
    if let Some(length) = row.length {
        settings.length = length;
    }
    if let Some(tone) = row.tone {
        settings.tone = tone;
    }
    if row.audience.is_some() {
        settings.audience = row.audience;
    }
    if row.instructions.is_some() {
        settings.custom_instructions = row.instructions;
    }

    GenerationInput {
        topic: row.topic,
        keywords: row.keywords,
        content_type: row
            .content_type
            .unwrap_or_else(|| options.content_type.clone()),
        settings,
        batch_id: Some(batch_id),
    }
}
