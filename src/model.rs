//! Data model for a crawled serial: chapters in crawl order plus book metadata.

use crate::scraper::ChapterPage;

/// One fetched and parsed chapter. Built once by the crawler and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// 0-based position in crawl order.
    pub sequence_index: u32,
    pub arc: String,
    pub title: String,
    pub url: String,
    /// Whitespace-normalized paragraphs separated by a blank line.
    pub body_text: String,
    /// Sanitized XHTML fragment for the ebook.
    pub body_html: String,
    pub image_urls: Vec<String>,
}

impl Chapter {
    pub fn from_page(sequence_index: u32, url: String, page: ChapterPage) -> Self {
        Self {
            sequence_index,
            arc: page.arc,
            title: page.title,
            url,
            body_text: page.body_text,
            body_html: page.body_html,
            image_urls: page.image_urls,
        }
    }

    /// Number of whitespace-delimited tokens in the body text.
    pub fn word_count(&self) -> u64 {
        self.body_text.split_whitespace().count() as u64
    }
}

/// Book-level metadata for the report header and the EPUB package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    pub identifier: String,
    pub description: Option<String>,
    pub language: String,
}

impl Default for BookMetadata {
    fn default() -> Self {
        Self {
            title: "SEEK".to_string(),
            author: "John C. McCrae (Wildbow)".to_string(),
            identifier: "seek-webserial".to_string(),
            description: Some("SEEK webserial by John C. McCrae (Wildbow)".to_string()),
            language: "en".to_string(),
        }
    }
}
