//! CLI parsing and orchestration. Crawls the serial, prints the word-count report, and
//! optionally writes the EPUB. Maps errors to exit codes.

use crate::config::{self, Config};
use crate::epub::{write_epub, EpubError};
use crate::model::{BookMetadata, Chapter};
use crate::report::{self, Style};
use crate::scraper::{crawl, CrawlError, PoliteClient, FIRST_CHAPTER_URL};
use crate::stats::{aggregate, WordCountReport};
use clap::{ArgAction, Parser};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OUTPUT: &str = "SEEK.epub";
const DEFAULT_DELAY_SECS: u64 = 1;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_COUNT: u32 = 3;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Crawl(#[from] CrawlError),

    #[error(transparent)]
    Epub(#[from] EpubError),

    #[error("{0}")]
    Validation(String),

    #[error("Cannot write report: {0}")]
    Report(String),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) | CliRunError::Report(_) => 1,
            CliRunError::Crawl(_) => 2,
            CliRunError::Epub(_) | CliRunError::Validation(_) => 3,
        }
    }
}

/// Run epubcheck on the given EPUB path. Requires epubcheck on PATH.
fn validate_epub(path: &Path) -> Result<(), CliRunError> {
    let output = std::process::Command::new("epubcheck")
        .arg(path)
        .output()
        .map_err(|e| {
            CliRunError::Validation(format!(
                "Could not run epubcheck: {}. Is epubcheck installed and on PATH?",
                e
            ))
        })?;
    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let msg = if stderr.is_empty() { stdout } else { stderr };
        Err(CliRunError::Validation(format!(
            "epubcheck reported errors:\n{}",
            msg.trim()
        )))
    }
}

#[derive(Parser, Debug)]
#[command(name = "seek-scrape")]
#[command(about = "Crawl the SEEK web serial, report word counts per arc, and optionally build an EPUB")]
#[command(
    after_help = "Config file keys (first_chapter_url, output, user_agent, request_delay_secs, timeout_secs, retry_count, retry_backoff_secs) are read from ./seek-scrape.toml or $XDG_CONFIG_HOME/seek-scrape/config.toml. CLI flags override config."
)]
pub struct Args {
    /// Increase log verbosity (-v info, -vv debug). Logs go to stderr.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Also build an EPUB of the crawled chapters.
    #[arg(short, long)]
    pub epub: bool,

    /// EPUB output path (default: SEEK.epub).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// First chapter URL (default: the first SEEK chapter).
    #[arg(long)]
    pub url: Option<String>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Delay between requests in seconds (overrides config; default 1).
    #[arg(long)]
    pub delay: Option<u64>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Suppress the progress spinner.
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Never color the report.
    #[arg(long)]
    pub no_color: bool,

    /// After writing the EPUB, run epubcheck on it (epubcheck must be on PATH).
    #[arg(long, requires = "epub")]
    pub validate: bool,
}

/// Effective settings after merging flags, config file, and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    first_url: String,
    output: PathBuf,
    user_agent: Option<String>,
    delay_secs: u64,
    timeout_secs: u64,
    retry_count: u32,
    retry_backoff_secs: Option<Vec<u64>>,
}

fn resolve_settings(args: &Args, config: &Config) -> Result<Settings, CliRunError> {
    let first_url = args
        .url
        .clone()
        .or_else(|| config.first_chapter_url.clone())
        .unwrap_or_else(|| FIRST_CHAPTER_URL.to_string());
    check_start_url(&first_url)?;

    Ok(Settings {
        first_url,
        output: args
            .output
            .clone()
            .or_else(|| config.output.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
        user_agent: args.user_agent.clone().or_else(|| config.user_agent.clone()),
        delay_secs: args
            .delay
            .or(config.request_delay_secs)
            .unwrap_or(DEFAULT_DELAY_SECS),
        timeout_secs: args
            .timeout
            .or(config.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
        retry_count: config.retry_count.unwrap_or(DEFAULT_RETRY_COUNT).max(1),
        retry_backoff_secs: config.retry_backoff_secs.clone(),
    })
}

/// The start URL must be an absolute http(s) URL.
fn check_start_url(input: &str) -> Result<(), CliRunError> {
    let url = reqwest::Url::parse(input).map_err(|e| {
        CliRunError::InvalidInput(format!(
            "Expected an absolute chapter URL, e.g. {}. Invalid: {}: {}",
            FIRST_CHAPTER_URL, input, e
        ))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(CliRunError::InvalidInput(format!(
            "Unsupported URL scheme '{}' in {}. Use http or https.",
            other, input
        ))),
    }
}

/// Ensure output path parent exists.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

fn build_client(settings: &Settings) -> Result<PoliteClient, CliRunError> {
    let mut builder = PoliteClient::builder()
        .delay_secs(settings.delay_secs)
        .timeout_secs(settings.timeout_secs)
        .retry_count(settings.retry_count);
    if let Some(backoff) = &settings.retry_backoff_secs {
        builder = builder.retry_backoff_secs(backoff.clone());
    }
    if let Some(ua) = &settings.user_agent {
        builder = builder.user_agent(ua.clone());
    }
    builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))
}

fn spinner() -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::default_spinner()
        .template("{spinner} {msg} ({elapsed})")
    {
        bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
    }
    bar.set_message("Fetching first chapter");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn print_report(
    report: &WordCountReport,
    metadata: &BookMetadata,
    json: bool,
    style: Style,
) -> Result<(), CliRunError> {
    let text = if json {
        serde_json::to_string_pretty(report).map_err(|e| CliRunError::Report(e.to_string()))? + "\n"
    } else {
        report::render(report, &metadata.title, style)
    };
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(|e| CliRunError::Report(e.to_string()))
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config()
        .map_err(CliRunError::InvalidInput)?
        .unwrap_or_default();
    let settings = resolve_settings(args, &config)?;
    if args.epub {
        validate_output_path(&settings.output)?;
    }
    let mut client = build_client(&settings)?;

    let progress = (!args.quiet && args.verbose == 0).then(spinner);
    let on_chapter = |chapter: &Chapter| {
        if let Some(bar) = &progress {
            bar.set_message(format!(
                "Scraped {} ({}), {} chapters so far",
                chapter.title,
                chapter.arc,
                chapter.sequence_index + 1
            ));
        }
    };
    let outcome = crawl(&mut client, &settings.first_url, Some(&on_chapter));
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    let metadata = BookMetadata::default();
    let report = aggregate(&outcome.chapters);
    let style = if args.no_color || !std::io::stdout().is_terminal() {
        Style::Plain
    } else {
        Style::Color
    };
    print_report(&report, &metadata, args.json, style)?;

    if let Some(err) = outcome.error {
        eprintln!(
            "Warning: crawl stopped early; the report covers only the first {} chapter(s).",
            outcome.chapters.len()
        );
        if args.epub {
            eprintln!("Warning: EPUB not written because the crawl did not complete.");
        }
        return Err(CliRunError::Crawl(err));
    }

    if args.epub {
        write_epub(&outcome.chapters, &metadata, &settings.output, &mut client)?;
        if args.validate {
            validate_epub(&settings.output)?;
        }
        tracing::info!(path = %settings.output.display(), "EPUB created");
        if !args.quiet {
            eprintln!("Wrote {}", settings.output.display());
        }
    }
    Ok(())
}
