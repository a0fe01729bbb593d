//! SEEK chapter page parser (seekwebserial.wordpress.com). Reads the chapter and arc
//! from the page title, the body from `div.entry-content`, and the navigation links.

use crate::scraper::content::{extract_content, has_strong_label, NEXT_LABEL, PREVIOUS_LABEL};
use crate::scraper::{parse_selector, ParseError};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

/// URL of the first chapter; the crawl starts here unless overridden.
pub const FIRST_CHAPTER_URL: &str = "https://seekwebserial.wordpress.com/2024/10/18/0-1-0-hack/";

/// Everything the parser reads from one chapter page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterPage {
    /// Chapter number as labelled by the serial, e.g. `0.1.O`.
    pub title: String,
    pub arc: String,
    pub body_text: String,
    pub body_html: String,
    pub image_urls: Vec<String>,
    pub previous_url: Option<String>,
    /// `None` on the last published chapter.
    pub next_url: Option<String>,
}

/// Parse a chapter page fetched from `page_url`.
///
/// Fails when the title, the content container, or every navigation link is missing.
pub fn parse_chapter_page(html: &str, page_url: &str) -> Result<ChapterPage, ParseError> {
    let base = Url::parse(page_url).map_err(|e| ParseError::InvalidLink {
        url: page_url.to_string(),
        href: page_url.to_string(),
        reason: e.to_string(),
    })?;
    let doc = Html::parse_document(html);

    let title_sel = parse_selector("title")?;
    let page_title = doc
        .select(&title_sel)
        .next()
        .map(|e| e.text().collect::<String>())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ParseError::MissingTitle {
            url: page_url.to_string(),
        })?;
    let (title, arc) = split_page_title(&page_title).ok_or_else(|| ParseError::MalformedTitle {
        url: page_url.to_string(),
        title: page_title.trim().to_string(),
    })?;

    let container_sel = parse_selector("div.entry-content")?;
    let container = doc
        .select(&container_sel)
        .next()
        .ok_or_else(|| ParseError::MissingContent {
            url: page_url.to_string(),
        })?;

    let anchor_sel = parse_selector("a")?;
    let strong_sel = parse_selector("strong")?;
    let previous_url = nav_link(&doc, &anchor_sel, &strong_sel, PREVIOUS_LABEL, &base)?;
    let next_url = nav_link(&doc, &anchor_sel, &strong_sel, NEXT_LABEL, &base)?;
    if previous_url.is_none() && next_url.is_none() {
        return Err(ParseError::MissingNavigation {
            url: page_url.to_string(),
        });
    }

    let content = extract_content(container, &base)?;
    tracing::debug!(
        url = page_url,
        %title,
        %arc,
        images = content.image_urls.len(),
        has_next = next_url.is_some(),
        "parsed chapter page"
    );

    Ok(ChapterPage {
        title,
        arc,
        body_text: content.text,
        body_html: content.html,
        image_urls: content.image_urls,
        previous_url,
        next_url,
    })
}

/// Split a page title like `0.1.0 – HACK – SEEK` into chapter label and arc label.
///
/// The chapter is the first token, upper-cased, with a trailing `0` segment read as
/// the letter `O`; the arc is the third token. Returns `None` for fewer than three tokens.
fn split_page_title(page_title: &str) -> Option<(String, String)> {
    let mut tokens = page_title.split_whitespace();
    let chapter = tokens.next()?;
    let _separator = tokens.next()?;
    let arc = tokens.next()?;
    Some((chapter_label(chapter), arc.to_string()))
}

fn chapter_label(token: &str) -> String {
    let upper = token.to_uppercase();
    match upper.rsplit_once('.') {
        Some((head, "0")) => format!("{}.O", head),
        _ => upper,
    }
}

/// href of the first anchor labelled `label`, resolved against the page URL.
///
/// `None` only when the label is unlinked or its anchor has no `href`. An empty or
/// fragment-only href resolves to the page itself.
fn nav_link(
    doc: &Html,
    anchor_sel: &Selector,
    strong_sel: &Selector,
    label: &str,
    base: &Url,
) -> Result<Option<String>, ParseError> {
    let anchor: Option<ElementRef<'_>> = doc
        .select(anchor_sel)
        .find(|a| has_strong_label(*a, label, strong_sel));
    let Some(href) = anchor.and_then(|a| a.value().attr("href")) else {
        return Ok(None);
    };
    let href = href.trim();
    base.join(href)
        .map(|u| Some(u.to_string()))
        .map_err(|e| ParseError::InvalidLink {
            url: base.to_string(),
            href: href.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://seek.example/2024/10/25/0-1-1-hack/";

    fn page(title: &str, nav: &str, body: &str) -> String {
        format!(
            r#"<!DOCTYPE html><html><head><title>{title}</title></head><body>
<article><div class="entry-content">
<p>{nav}</p>
{body}
<p>{nav}</p>
</div></article></body></html>"#
        )
    }

    const NAV_BOTH: &str = r#"<a href="/2024/10/18/0-1-0-hack/"><strong>Previous Chapter</strong></a> <a href="https://seek.example/2024/11/01/0-1-2-hack/"><strong>Next Chapter</strong></a>"#;

    #[test]
    fn parses_title_arc_links_and_body() -> Result<(), ParseError> {
        let html = page(
            "0.1.1 &#8211; HACK &#8211; SEEK",
            NAV_BOTH,
            "<p>Four words right here.</p><p>And three more.</p>",
        );
        let parsed = parse_chapter_page(&html, URL)?;
        assert_eq!(parsed.title, "0.1.1");
        assert_eq!(parsed.arc, "HACK");
        assert_eq!(
            parsed.previous_url.as_deref(),
            Some("https://seek.example/2024/10/18/0-1-0-hack/")
        );
        assert_eq!(
            parsed.next_url.as_deref(),
            Some("https://seek.example/2024/11/01/0-1-2-hack/")
        );
        assert_eq!(parsed.body_text, "Four words right here.\n\nAnd three more.");
        assert_eq!(parsed.body_text.split_whitespace().count(), 7);
        Ok(())
    }

    #[test]
    fn last_chapter_has_no_next_link() -> Result<(), ParseError> {
        let nav = r#"<a href="/prev/"><strong>Previous Chapter</strong></a> <strong>Next Chapter</strong>"#;
        let parsed = parse_chapter_page(&page("2.4.3 - MUTE - SEEK", nav, "<p>End.</p>"), URL)?;
        assert!(parsed.next_url.is_none());
        assert!(parsed.previous_url.is_some());
        assert_eq!(parsed.body_text, "End.");
        Ok(())
    }

    #[test]
    fn empty_or_fragment_next_href_points_at_the_page() -> Result<(), ParseError> {
        for href in ["#", "", "#comments"] {
            let nav = format!(r#"<a href="{href}"><strong>Next Chapter</strong></a>"#);
            let parsed = parse_chapter_page(&page("0.1.1 - HACK - SEEK", &nav, "<p>x</p>"), URL)?;
            let next = parsed.next_url.expect("linked label yields a next URL");
            assert!(next.starts_with(URL), "{href:?} resolved to {next}");
        }
        Ok(())
    }

    #[test]
    fn anchor_without_href_is_not_a_link() -> Result<(), ParseError> {
        let nav = r#"<a href="/prev/"><strong>Previous Chapter</strong></a> <a><strong>Next Chapter</strong></a>"#;
        let parsed = parse_chapter_page(&page("0.1.1 - HACK - SEEK", nav, "<p>x</p>"), URL)?;
        assert!(parsed.next_url.is_none());
        Ok(())
    }

    #[test]
    fn missing_title_is_parse_error() {
        let html = r#"<html><body><div class="entry-content"><p><a href="/n/"><strong>Next Chapter</strong></a></p></div></body></html>"#;
        assert!(matches!(
            parse_chapter_page(html, URL),
            Err(ParseError::MissingTitle { .. })
        ));
    }

    #[test]
    fn short_title_is_malformed() {
        let html = page("SEEK", NAV_BOTH, "<p>x</p>");
        match parse_chapter_page(&html, URL) {
            Err(ParseError::MalformedTitle { title, .. }) => assert_eq!(title, "SEEK"),
            other => panic!("expected MalformedTitle, got {:?}", other),
        }
    }

    #[test]
    fn missing_navigation_is_parse_error() {
        let html = page("0.1.1 - HACK - SEEK", "no links here", "<p>Body.</p>");
        assert!(matches!(
            parse_chapter_page(&html, URL),
            Err(ParseError::MissingNavigation { .. })
        ));
    }

    #[test]
    fn missing_content_container_is_parse_error() {
        let html = r#"<html><head><title>0.1.1 - HACK - SEEK</title></head><body><p><a href="/n/"><strong>Next Chapter</strong></a></p></body></html>"#;
        assert!(matches!(
            parse_chapter_page(html, URL),
            Err(ParseError::MissingContent { .. })
        ));
    }

    #[test]
    fn reparsing_identical_input_is_stable() -> Result<(), ParseError> {
        let html = page("0.1.1 - HACK - SEEK", NAV_BOTH, "<p>a  b\n c</p><p>d</p>");
        let first = parse_chapter_page(&html, URL)?;
        let second = parse_chapter_page(&html, URL)?;
        assert_eq!(first, second);
        assert_eq!(first.body_text.split_whitespace().count(), 4);
        Ok(())
    }

    #[test]
    fn chapter_label_reads_trailing_zero_as_letter_o() {
        assert_eq!(chapter_label("0.1.0"), "0.1.O");
        assert_eq!(chapter_label("1.0"), "1.O");
        assert_eq!(chapter_label("1.10"), "1.10");
        assert_eq!(chapter_label("2.3.4"), "2.3.4");
        assert_eq!(chapter_label("1.2.o"), "1.2.O");
    }

    #[test]
    fn split_page_title_needs_three_tokens() {
        assert_eq!(
            split_page_title("  0.2.1 – ORION – SEEK "),
            Some(("0.2.1".to_string(), "ORION".to_string()))
        );
        assert_eq!(split_page_title("0.2.1 –"), None);
    }
}
