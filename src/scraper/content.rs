//! Chapter body extraction for the WordPress layout: locate the story between the
//! navigation blocks, sanitize it to an XHTML fragment, and derive the plain text
//! used for word counting.

use crate::scraper::{clean_image_url, parse_selector, ParseError};
use reqwest::Url;
use scraper::{ElementRef, Node, Selector};

pub(crate) const PREVIOUS_LABEL: &str = "Previous Chapter";
pub(crate) const NEXT_LABEL: &str = "Next Chapter";

const DROPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "iframe"];
const VOID_ELEMENTS: &[&str] = &["br", "hr", "wbr"];
const KEPT_ATTRIBUTES: &[&str] = &["class", "id", "style", "lang", "dir", "title"];

/// Extracted chapter body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterContent {
    /// Sanitized XHTML fragment (top-level blocks in document order).
    pub html: String,
    /// Whitespace-normalized paragraphs separated by a blank line.
    pub text: String,
    /// Absolute image URLs without query string, in document order, deduplicated.
    pub image_urls: Vec<String>,
}

pub(crate) fn is_nav_label(s: &str) -> bool {
    let t = s.trim();
    t == PREVIOUS_LABEL || t == NEXT_LABEL
}

/// True if `el` has a `<strong>` descendant reading exactly `label`.
pub(crate) fn has_strong_label(el: ElementRef<'_>, label: &str, strong: &Selector) -> bool {
    el.select(strong)
        .any(|s| s.text().collect::<String>().trim() == label)
}

fn is_descendant_of(el: ElementRef<'_>, ancestor: ElementRef<'_>) -> bool {
    el.ancestors().any(|a| a.id() == ancestor.id())
}

fn inside_element(el: ElementRef<'_>, name: &str) -> bool {
    el.ancestors()
        .filter_map(|a| a.value().as_element())
        .any(|e| e.name() == name)
}

/// Extract the chapter body from the content container.
///
/// The body runs from the block after the first `Next Chapter` label up to the
/// block holding the closing navigation: `Next Chapter` again on the first
/// chapter, `Previous Chapter` on every other. Image blocks above the header
/// navigation are kept. When either marker is missing every block is used.
pub fn extract_content(container: ElementRef<'_>, base: &Url) -> Result<ChapterContent, ParseError> {
    let block_sel = parse_selector("p, div, figure")?;
    let strong_sel = parse_selector("strong")?;
    let img_sel = parse_selector("img")?;

    let blocks: Vec<ElementRef<'_>> = container.select(&block_sel).collect();
    let contains = |b: &ElementRef<'_>, label: &str| has_strong_label(*b, label, &strong_sel);

    let is_first = !blocks.iter().take(3).any(|b| contains(b, PREVIOUS_LABEL));
    tracing::debug!(url = %base, is_first, blocks = blocks.len(), "extracting content");

    let start = blocks.iter().position(|b| contains(b, NEXT_LABEL));
    let end_marker = if is_first { NEXT_LABEL } else { PREVIOUS_LABEL };
    let range = start.and_then(|s| {
        // Blocks nested in the header navigation block belong to it.
        let body_start = (s + 1..blocks.len())
            .find(|&i| !is_descendant_of(blocks[i], blocks[s]))
            .unwrap_or(blocks.len());
        let end = (body_start..blocks.len()).find(|&i| contains(&blocks[i], end_marker))?;
        Some((s, body_start, end))
    });

    let mut builder = ContentBuilder::new(base, &strong_sel, &img_sel);
    match range {
        Some((header, body_start, end)) => {
            tracing::debug!(url = %base, body_start, end, "found navigation markers");
            for block in &blocks[..header] {
                if block.select(&img_sel).next().is_some() {
                    builder.push_block(*block, false);
                }
            }
            for block in &blocks[body_start..end] {
                builder.push_block(*block, true);
            }
        }
        None => {
            tracing::warn!(url = %base, "could not find content markers, using the whole content container");
            for block in &blocks {
                builder.push_block(*block, true);
            }
        }
    }
    Ok(builder.finish())
}

struct ContentBuilder<'a, 's> {
    base: &'s Url,
    strong_sel: &'s Selector,
    img_sel: &'s Selector,
    html: String,
    paragraphs: Vec<String>,
    image_urls: Vec<String>,
    included: Vec<ElementRef<'a>>,
}

impl<'a, 's> ContentBuilder<'a, 's> {
    fn new(base: &'s Url, strong_sel: &'s Selector, img_sel: &'s Selector) -> Self {
        Self {
            base,
            strong_sel,
            img_sel,
            html: String::new(),
            paragraphs: Vec::new(),
            image_urls: Vec::new(),
            included: Vec::new(),
        }
    }

    /// Add one block. Nested blocks whose ancestor was already serialized only
    /// contribute their text.
    fn push_block(&mut self, block: ElementRef<'a>, count_text: bool) {
        if count_text && block.value().name() == "p" && !inside_element(block, "figcaption") {
            let text = paragraph_text(block);
            if !text.is_empty() {
                self.paragraphs.push(text);
            }
        }
        if self
            .included
            .iter()
            .any(|inc| is_descendant_of(block, *inc))
        {
            return;
        }
        self.included.push(block);
        self.write_element(block, true);
        self.html.push('\n');
    }

    fn finish(self) -> ChapterContent {
        ChapterContent {
            html: self.html,
            text: self.paragraphs.join("\n\n"),
            image_urls: self.image_urls,
        }
    }

    fn unwrap_anchor(&self, a: ElementRef<'_>) -> bool {
        if has_strong_label(a, PREVIOUS_LABEL, self.strong_sel)
            || has_strong_label(a, NEXT_LABEL, self.strong_sel)
        {
            return true;
        }
        a.select(self.img_sel).next().is_some() && a.text().collect::<String>().trim().is_empty()
    }

    fn write_image(&mut self, img: ElementRef<'_>) {
        let Some(src) = img
            .value()
            .attr("src")
            .and_then(|s| clean_image_url(self.base, s))
        else {
            return;
        };
        let alt = img.value().attr("alt").unwrap_or("");
        self.html.push_str(&format!(
            r#"<img src="{}" alt="{}"/>"#,
            escape_attr(&src),
            escape_attr(alt)
        ));
        if !self.image_urls.contains(&src) {
            self.image_urls.push(src);
        }
    }

    /// Absolute form of a body link. In-page fragments stay as they are; unparseable hrefs are dropped.
    fn link_target(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.starts_with('#') {
            return Some(href.to_string());
        }
        self.base.join(href).ok().map(String::from)
    }

    fn write_element(&mut self, el: ElementRef<'_>, top_level: bool) {
        let name = el.value().name();
        if DROPPED_ELEMENTS.contains(&name) {
            return;
        }
        match name {
            "img" => {
                self.write_image(el);
                return;
            }
            "a" if self.unwrap_anchor(el) => {
                self.write_children(el);
                return;
            }
            "strong" if is_nav_label(&el.text().collect::<String>()) => return,
            _ => {}
        }

        self.html.push('<');
        self.html.push_str(name);
        for (attr, value) in el.value().attrs() {
            let kept = KEPT_ATTRIBUTES.contains(&attr) || (name == "a" && attr == "href");
            if !kept {
                continue;
            }
            let value = if attr == "href" {
                match self.link_target(value) {
                    Some(v) => v,
                    None => continue,
                }
            } else if top_level && attr == "style" {
                important_style(value)
            } else {
                value.to_string()
            };
            self.html
                .push_str(&format!(r#" {}="{}""#, attr, escape_attr(&value)));
        }
        if VOID_ELEMENTS.contains(&name) {
            self.html.push_str("/>");
            return;
        }
        self.html.push('>');
        self.write_children(el);
        self.html.push_str("</");
        self.html.push_str(name);
        self.html.push('>');
    }

    fn write_children(&mut self, el: ElementRef<'_>) {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => {
                    if !is_nav_label(text) {
                        self.html.push_str(&escape_text(text));
                    }
                }
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.write_element(child_el, false);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Visible text of a paragraph with navigation labels removed and whitespace collapsed.
fn paragraph_text(p: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in p.descendants() {
        match node.value() {
            Node::Text(text) => {
                let in_dropped = node
                    .parent()
                    .and_then(|parent| parent.value().as_element())
                    .is_some_and(|e| DROPPED_ELEMENTS.contains(&e.name()));
                if !in_dropped && !is_nav_label(text) {
                    raw.push_str(text);
                }
            }
            Node::Element(e) if e.name() == "br" => raw.push(' '),
            _ => {}
        }
    }
    normalize_whitespace(&raw)
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Mark every inline declaration `!important` so reader stylesheets do not override it.
fn important_style(style: &str) -> String {
    style
        .split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| {
            if d.contains("!important") {
                d.to_string()
            } else {
                format!("{} !important", d)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
