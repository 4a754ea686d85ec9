use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;
use uuid::Uuid;

mod ai;
mod app;
mod config;
mod content;
mod db;
mod error;
mod models;
mod pipeline;
mod services;

use app::App;
use config::Config;
use error::Result;
use models::{ArticleFilter, ArticleStatus, ReviewStatus, SortDirection, SortField};
use pipeline::{GenerationInput, GenerationOutcome, ProgressEvent};

#[derive(Debug, Parser)]
#[command(name = "content-forge", version, about = "AI article generation pipeline")]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate one article
    Generate(GenerateArgs),
    /// Generate one article per row of a CSV file
    Batch {
        file: PathBuf,
        /// Write the per-row summary CSV here
        #[arg(long)]
        summary: Option<PathBuf>,
        /// Pause between rows in milliseconds (overrides batch_delay_ms)
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// List generated articles
    List(ListArgs),
    /// List content requests
    Requests {
        #[arg(long)]
        batch: Option<Uuid>,
    },
    /// Show an article by id or slug
    Show { id_or_slug: String },
    /// Change an article's publication status
    SetStatus { id: Uuid, status: ArticleStatus },
    /// Change an article's review status
    Review { id: Uuid, review: ReviewStatus },
    /// Delete an article and its images
    Delete { id: Uuid },
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long)]
    topic: String,
    /// Comma-separated seed keywords
    #[arg(long, value_delimiter = ',')]
    keywords: Vec<String>,
    #[arg(long)]
    content_type: Option<String>,
    #[arg(long)]
    tone: Option<String>,
    /// Target length in words
    #[arg(long)]
    length: Option<u32>,
    #[arg(long)]
    audience: Option<String>,
    #[arg(long)]
    instructions: Option<String>,
    #[arg(long)]
    no_images: bool,
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(long)]
    status: Option<ArticleStatus>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    keyword: Option<String>,
    /// Created on or after this date (YYYY-MM-DD)
    #[arg(long)]
    since: Option<NaiveDate>,
    /// Created on or before this date (YYYY-MM-DD)
    #[arg(long)]
    until: Option<NaiveDate>,
    #[arg(long, default_value = "created_at")]
    sort: SortField,
    #[arg(long)]
    asc: bool,
    #[arg(long)]
    limit: Option<u32>,
}

impl ListArgs {
    fn into_filter(self) -> ArticleFilter {
        ArticleFilter {
            status: self.status,
            category: self.category,
            keyword: self.keyword,
            created_after: self
                .since
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc()),
            created_before: self
                .until
                .and_then(|d| d.and_hms_opt(23, 59, 59))
                .map(|dt| dt.and_utc()),
            sort: self.sort,
            direction: if self.asc {
                SortDirection::Asc
            } else {
                SortDirection::Desc
            },
            limit: self.limit,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Progress is only interesting for commands that generate
    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_progress(progress_rx));

    let app = App::new(config, Some(progress_tx)).await?;
    let watcher = app.watch_changes();
    let result = run_command(&app, cli.command).await;
    watcher.abort();

    // Dropping the app closes the progress channel so the printer drains and exits
    drop(app);
    let _ = printer.await;

    result
}

async fn run_command(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Generate(args) => {
            let mut settings = app.config().generation_settings();
            if let Some(tone) = args.tone {
                settings.tone = tone;
            }
            if let Some(length) = args.length {
                settings.length = length;
            }
            settings.audience = args.audience;
            settings.custom_instructions = args.instructions;
            if args.no_images {
                settings.include_images = false;
            }

            let outcome = app
                .generate(GenerationInput {
                    topic: args.topic,
                    keywords: args.keywords,
                    content_type: args
                        .content_type
                        .unwrap_or_else(|| app.config().default_content_type.clone()),
                    settings,
                    batch_id: None,
                })
                .await?;
            print_outcome(&outcome);
            outcome.ensure_success()?;
        }

        Command::Batch {
            file,
            summary,
            delay_ms,
        } => {
            let report = app
                .run_batch_file(&file, delay_ms.map(Duration::from_millis))
                .await?;
            println!(
                "Batch {}: {} completed, {} failed",
                report.batch_id,
                report.success_count(),
                report.failure_count()
            );
            for error in &report.errors {
                println!("  row {} ({}): {}", error.row, error.topic, error.message);
            }
            if let Some(path) = summary {
                std::fs::write(&path, report.to_csv())?;
                println!("Summary written to {:?}", path);
            }
        }

        Command::List(args) => {
            let articles = app.list_articles(args.into_filter()).await?;
            for article in &articles {
                println!(
                    "{}  {:<10} seo {:>3}  quality {:>3}  views {:>5}  {}",
                    article.id,
                    article.status,
                    article.seo_score,
                    article.quality_score,
                    article.view_count,
                    article.slug
                );
            }
            println!("{} article(s)", articles.len());
        }

        Command::Requests { batch } => {
            for request in app.list_requests(batch).await? {
                println!(
                    "{}  {:<10} {:>3}%  {}{}",
                    request.id,
                    request.status,
                    request.progress,
                    request.title,
                    request
                        .error_message
                        .map(|e| format!("  [{}]", e))
                        .unwrap_or_default()
                );
            }
        }

        Command::Show { id_or_slug } => {
            let (article, images) = app.open_article(&id_or_slug).await?;
            println!("{}\n", article.title);
            println!("slug:     {}", article.slug);
            println!("status:   {} (review: {})", article.status, article.review_status);
            println!(
                "words:    {} (~{} min read)",
                article.word_count, article.reading_time_minutes
            );
            println!("scores:   seo {} / quality {}", article.seo_score, article.quality_score);
            println!("keywords: {}", article.keywords.join(", "));
            for image in &images {
                println!("image:    {}", image.url);
            }
            println!("\n{}\n\n{}", article.excerpt, article.body);
        }

        Command::SetStatus { id, status } => {
            app.set_status(id, status).await?;
            println!("{} -> {}", id, status);
        }

        Command::Review { id, review } => {
            app.set_review(id, review).await?;
            println!("{} review -> {}", id, review);
        }

        Command::Delete { id } => {
            app.delete_article(id).await?;
            println!("Deleted {}", id);
        }
    }

    Ok(())
}

async fn print_progress(mut rx: mpsc::UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        eprintln!(
            "[{:>3}%] {:<8} {:<10} ({}%)",
            event.overall, event.phase, event.status, event.phase_progress
        );
    }
}

fn print_outcome(outcome: &GenerationOutcome) {
    for phase in &outcome.phases {
        println!(
            "{:<8} {:<10}{}",
            phase.phase,
            phase.status,
            phase
                .message
                .as_deref()
                .map(|m| format!("  {}", m))
                .unwrap_or_default()
        );
    }

    match &outcome.article {
        Some(article) => println!(
            "\nCreated \"{}\" ({}), {} words, {} image(s), seo {} / quality {}",
            article.title,
            article.slug,
            article.word_count,
            outcome.images.len(),
            article.seo_score,
            article.quality_score
        ),
        None => println!(
            "\nRequest {} failed: {}",
            outcome.request.id,
            outcome.error.as_deref().unwrap_or("unknown error")
        ),
    }
}
