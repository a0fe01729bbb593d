//! Error types for fetching, parsing, and crawling. Every variant names the URL involved.

use thiserror::Error;

/// A page or resource could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: could not reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body from {url}: {source}")]
    BodyRead {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            FetchError::Network { url, .. }
            | FetchError::HttpStatus { url, .. }
            | FetchError::BodyRead { url, .. } => url,
        }
    }
}

/// A chapter page is missing one of the structural markers the parser relies on.
///
/// Usually means the page is malformed or the site layout changed.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Could not parse chapter at {url}: page has no <title>.")]
    MissingTitle { url: String },

    #[error("Could not parse chapter at {url}: title {title:?} is not of the form '<chapter> - <ARC> ...'.")]
    MalformedTitle { url: String, title: String },

    #[error("Could not parse chapter at {url}: missing content container (div.entry-content).")]
    MissingContent { url: String },

    #[error("Could not parse chapter at {url}: no Previous/Next Chapter navigation link.")]
    MissingNavigation { url: String },

    #[error("Could not parse chapter at {url}: invalid link {href:?}: {reason}")]
    InvalidLink {
        url: String,
        href: String,
        reason: String,
    },

    #[error("Invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Terminal failure of a crawl. Chapters parsed before the failure remain available.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Cycle detected: chapter {from_index} links back to already visited {url}")]
    CycleDetected { url: String, from_index: u32 },
}

impl CrawlError {
    /// Short machine-friendly name of the error kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            CrawlError::InvalidUrl { .. } => "invalid-url",
            CrawlError::Fetch(_) => "fetch",
            CrawlError::Parse(_) => "parse",
            CrawlError::CycleDetected { .. } => "cycle",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_url() {
        let err = CrawlError::from(ParseError::MissingNavigation {
            url: "https://example.com/ch-2/".to_string(),
        });
        assert!(err.to_string().contains("https://example.com/ch-2/"));
        assert_eq!(err.kind(), "parse");

        let err = CrawlError::from(FetchError::HttpStatus {
            status: 404,
            url: "https://example.com/gone/".to_string(),
        });
        assert_eq!(err.to_string(), "HTTP 404 when fetching: https://example.com/gone/");
        assert_eq!(err.kind(), "fetch");
    }

    #[test]
    fn cycle_message_names_url_and_chapter() {
        let err = CrawlError::CycleDetected {
            url: "https://example.com/ch-1/".to_string(),
            from_index: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("chapter 3"));
        assert!(msg.contains("https://example.com/ch-1/"));
        assert_eq!(err.kind(), "cycle");
    }
}
