//! Fetching and parsing chapter pages, and crawling the next-chapter chain.

mod client;
mod content;
mod crawler;
mod error;

pub mod seek;

pub use client::{PoliteClient, PoliteClientBuilder};
pub use crawler::{crawl, Crawl, CrawlOutcome, CrawlState};
pub use error::{CrawlError, FetchError, ParseError};
pub use seek::{parse_chapter_page, ChapterPage, FIRST_CHAPTER_URL};

use reqwest::Url;
use scraper::Selector;

/// Parse a CSS selector or return a parse error (avoids panics from Selector::parse).
pub(crate) fn parse_selector(sel: &str) -> Result<Selector, ParseError> {
    Selector::parse(sel).map_err(|e| ParseError::InvalidSelector {
        selector: sel.to_string(),
        reason: e.to_string(),
    })
}

/// Raw bytes of a fetched resource (e.g. an image) with its declared content type.
#[derive(Debug, Clone)]
pub struct Resource {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Source of pages and resources. Implemented by [PoliteClient]; tests use in-memory fakes.
pub trait PageFetcher {
    /// Fetch a page and return its HTML.
    fn fetch_page(&mut self, url: &str) -> Result<String, FetchError>;

    /// Fetch a binary resource.
    fn fetch_resource(&mut self, url: &str) -> Result<Resource, FetchError>;
}

impl<F: PageFetcher + ?Sized> PageFetcher for &mut F {
    fn fetch_page(&mut self, url: &str) -> Result<String, FetchError> {
        (**self).fetch_page(url)
    }

    fn fetch_resource(&mut self, url: &str) -> Result<Resource, FetchError> {
        (**self).fetch_resource(url)
    }
}

/// Key used to recognise an already visited page: the absolute URL without its fragment.
pub(crate) fn visit_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

/// Resolve an image `src` against the page URL and drop its query string
/// (WordPress appends resize parameters).
pub(crate) fn clean_image_url(base: &Url, src: &str) -> Option<String> {
    let mut url = base.join(src.trim()).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visit_key_strips_fragment_only() {
        let a = Url::parse("https://seek.example/2024/10/18/ch-1/#comments").unwrap();
        let b = Url::parse("https://seek.example/2024/10/18/ch-1/").unwrap();
        assert_eq!(visit_key(&a), visit_key(&b));
        let c = Url::parse("https://seek.example/2024/10/18/ch-1/?p=3").unwrap();
        assert_ne!(visit_key(&b), visit_key(&c));
    }

    #[test]
    fn clean_image_url_resolves_and_drops_query() {
        let base = Url::parse("https://seek.example/2024/10/18/ch-1/").unwrap();
        assert_eq!(
            clean_image_url(&base, "https://cdn.example/art.png?w=1024&h=768").as_deref(),
            Some("https://cdn.example/art.png")
        );
        assert_eq!(
            clean_image_url(&base, "/wp-content/uploads/map.jpg?resize=300").as_deref(),
            Some("https://seek.example/wp-content/uploads/map.jpg")
        );
    }
}
