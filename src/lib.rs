//! seek-scrape: crawls the SEEK web serial chapter by chapter, reports word counts per arc,
//! and optionally packages the chapters as an EPUB.

pub mod cli;
pub mod config;
pub mod epub;
pub mod logging;
pub mod model;
pub mod report;
pub mod scraper;
pub mod stats;

// Re-exports for CLI and consumers.
pub use epub::{write_epub, EpubError};
pub use model::{BookMetadata, Chapter};
pub use report::{render, Style};
pub use scraper::{
    crawl, parse_chapter_page, CrawlError, CrawlOutcome, FetchError, PageFetcher, ParseError,
    PoliteClient, PoliteClientBuilder, FIRST_CHAPTER_URL,
};
pub use stats::{aggregate, group_by_arc, WordCountReport};
