//! Image download and naming for the EPUB. Each distinct URL is fetched once and
//! stored under `images/`; chapter markup is rewritten to point at the local copy.

use crate::model::Chapter;
use crate::scraper::PageFetcher;
use reqwest::Url;

/// Inline centering for readers that ignore the stylesheet.
const CENTERING_STYLE: &str =
    "display:block;margin-left:auto;margin-right:auto;max-width:100%;height:auto;";

/// An image stored in the archive.
#[derive(Debug, Clone)]
pub(crate) struct EmbeddedImage {
    pub url: String,
    /// Path relative to the OEBPS directory, e.g. `images/map.png`.
    pub href: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

/// Download every image referenced by the chapters, in chapter order.
///
/// A failed download is logged and skipped; the chapter keeps the remote reference.
pub(crate) fn download_images(
    chapters: &[Chapter],
    fetcher: &mut dyn PageFetcher,
) -> Vec<EmbeddedImage> {
    let mut images: Vec<EmbeddedImage> = Vec::new();
    let mut failed: Vec<&str> = Vec::new();
    for url in chapters.iter().flat_map(|c| c.image_urls.iter()) {
        if images.iter().any(|i| &i.url == url) || failed.contains(&url.as_str()) {
            continue;
        }
        let resource = match fetcher.fetch_resource(url) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(url = %e.url(), error = %e, "failed to download image, keeping remote reference");
                failed.push(url);
                continue;
            }
        };
        let name = file_name_for(url, images.len());
        let href = unique_href(&name, &images);
        let media_type = media_type_for(&href, resource.content_type.as_deref());
        tracing::debug!(url = %url, %href, %media_type, bytes = resource.bytes.len(), "embedded image");
        images.push(EmbeddedImage {
            url: url.clone(),
            href,
            media_type,
            data: resource.bytes,
        });
    }
    images
}

/// Point `<img>` tags at the embedded copies and add inline centering.
pub(crate) fn rewrite_image_sources(html: &str, images: &[EmbeddedImage]) -> String {
    let mut out = html.to_string();
    for image in images {
        let remote = format!(r#"src="{}""#, attr_escape(&image.url));
        let local = format!(
            r#"src="{}" style="{}""#,
            attr_escape(&image.href),
            CENTERING_STYLE
        );
        out = out.replace(&remote, &local);
    }
    out
}

/// File name from the last URL path segment, restricted to safe characters.
fn file_name_for(url: &str, position: usize) -> String {
    let segment = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(String::from))
        })
        .unwrap_or_default()
        .replace("%20", "_");
    let name: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.trim_matches(|c| c == '.' || c == '_').is_empty() {
        format!("img_{}", position)
    } else {
        name
    }
}

/// `images/<name>`, suffixed `_1`, `_2`, ... before the extension on collision.
fn unique_href(name: &str, taken: &[EmbeddedImage]) -> String {
    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    };
    let mut candidate = format!("images/{}", name);
    let mut counter = 1;
    while taken.iter().any(|i| i.href == candidate) {
        candidate = format!("images/{}_{}{}", stem, counter, ext);
        counter += 1;
    }
    candidate
}

/// Media type from the file extension, else an `image/*` content type, else JPEG.
fn media_type_for(href: &str, content_type: Option<&str>) -> String {
    let ext = href
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    let by_ext = match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "svg" => Some("image/svg+xml"),
        "webp" => Some("image/webp"),
        _ => None,
    };
    if let Some(mt) = by_ext {
        return mt.to_string();
    }
    content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or_else(|| "image/jpeg".to_string())
}

fn attr_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
