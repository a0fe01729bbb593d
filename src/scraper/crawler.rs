//! Sequential crawl along the next-chapter links.

use crate::model::Chapter;
use crate::scraper::{parse_chapter_page, visit_key, CrawlError, PageFetcher};
use reqwest::Url;
use std::collections::HashSet;

/// Where a crawl stands between two chapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlState {
    /// The next call fetches this URL (the start URL, or the last next-link).
    Pending(String),
    /// The last page had no next-link.
    Done,
    /// A fetch, parse, or cycle error was returned.
    Failed,
}

/// Lazy crawl: yields one chapter per page, following next-links until a page has none.
///
/// Each URL is visited at most once; a next-link back to a visited page yields
/// [CrawlError::CycleDetected]. After any error the iterator is exhausted.
pub struct Crawl<F: PageFetcher> {
    fetcher: F,
    state: CrawlState,
    visited: HashSet<String>,
    next_index: u32,
}

impl<F: PageFetcher> Crawl<F> {
    pub fn new(fetcher: F, first_url: &str) -> Self {
        Self {
            fetcher,
            state: CrawlState::Pending(first_url.to_string()),
            visited: HashSet::new(),
            next_index: 0,
        }
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    fn step(&mut self, url: String) -> Result<(Chapter, Option<String>), CrawlError> {
        let parsed_url = Url::parse(&url).map_err(|e| CrawlError::InvalidUrl {
            input: url.clone(),
            reason: e.to_string(),
        })?;
        if !self.visited.insert(visit_key(&parsed_url)) {
            return Err(CrawlError::CycleDetected {
                url,
                from_index: self.next_index.saturating_sub(1),
            });
        }

        tracing::info!(url = %url, index = self.next_index, "scraping chapter");
        let html = self.fetcher.fetch_page(&url)?;
        let page = parse_chapter_page(&html, &url)?;
        let next_url = page.next_url.clone();
        let chapter = Chapter::from_page(self.next_index, url, page);
        self.next_index += 1;
        Ok((chapter, next_url))
    }
}

impl<F: PageFetcher> Iterator for Crawl<F> {
    type Item = Result<Chapter, CrawlError>;

    fn next(&mut self) -> Option<Self::Item> {
        let url = match std::mem::replace(&mut self.state, CrawlState::Failed) {
            CrawlState::Pending(url) => url,
            finished => {
                self.state = finished;
                return None;
            }
        };
        match self.step(url) {
            Ok((chapter, next_url)) => {
                self.state = match next_url {
                    Some(next) => CrawlState::Pending(next),
                    None => {
                        tracing::info!(chapters = self.next_index, "reached last chapter");
                        CrawlState::Done
                    }
                };
                Some(Ok(chapter))
            }
            Err(e) => {
                tracing::warn!(kind = e.kind(), error = %e, "crawl stopped");
                Some(Err(e))
            }
        }
    }
}

/// Chapters collected by a crawl and the error that ended it early, if any.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub chapters: Vec<Chapter>,
    pub error: Option<CrawlError>,
}

impl CrawlOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Crawl from `first_url` to the last chapter. Calls `on_chapter` after each parsed page.
///
/// Chapters parsed before a failure are kept in the outcome.
pub fn crawl<F: PageFetcher>(
    fetcher: F,
    first_url: &str,
    on_chapter: Option<&dyn Fn(&Chapter)>,
) -> CrawlOutcome {
    let mut chapters = Vec::new();
    for item in Crawl::new(fetcher, first_url) {
        match item {
            Ok(chapter) => {
                if let Some(cb) = on_chapter {
                    cb(&chapter);
                }
                chapters.push(chapter);
            }
            Err(e) => {
                return CrawlOutcome {
                    chapters,
                    error: Some(e),
                }
            }
        }
    }
    CrawlOutcome {
        chapters,
        error: None,
    }
}
