//! EPUB 3 writer. Lays the crawled chapters out as title page, then one divider page
//! per arc followed by that arc's chapters; embeds chapter images.

mod images;

use crate::model::{BookMetadata, Chapter};
use crate::scraper::PageFetcher;
use crate::stats::{group_by_arc, ArcGroup};
use images::{download_images, rewrite_image_sources, EmbeddedImage};
use std::io::{Seek, Write};
use std::path::Path;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTAINER_XML: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n  <rootfiles>\n    <rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/>\n  </rootfiles>\n</container>";

const STYLE_CSS: &str = r#"body {
    font-family: Cambria, Liberation Serif, Bitstream Vera Serif, Georgia, Times, Times New Roman, serif;
    line-height: 1.5;
    padding: 2em;
    margin: 0 auto;
    max-width: 35em;
}
h1 {
    font-size: 1.5em;
    margin-bottom: 0.5em;
}
h1.book-title {
    text-align: center;
    margin-top: 40vh;
}
.chapter-content {
    margin-top: 2em;
}
.chapter-content img {
    display: block;
    margin-left: auto;
    margin-right: auto;
    max-width: 100%;
    height: auto;
}
"#;

/// Errors from the EPUB writer. Map to CLI exit code 3.
#[derive(Debug, Error)]
pub enum EpubError {
    #[error("Cannot write EPUB: book title is empty.")]
    EmptyTitle,

    #[error("Cannot write EPUB: book author is empty.")]
    EmptyAuthor,

    #[error("Cannot write EPUB: no chapters were scraped.")]
    NoChapters,

    #[error("Failed to create EPUB file: {path}: {source}")]
    CreateFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write EPUB archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl From<std::io::Error> for EpubError {
    fn from(e: std::io::Error) -> Self {
        EpubError::Zip(zip::result::ZipError::Io(e))
    }
}

const MIMETYPE: &[u8] = b"application/epub+zip";
const OEBPS_PREFIX: &str = "OEBPS/";

/// Everything the package documents need, computed once before writing.
struct Layout<'a> {
    metadata: &'a BookMetadata,
    arcs: Vec<ArcGroup<'a>>,
    images: Vec<EmbeddedImage>,
    /// `YYYY-MM-DD` for `dc:date`.
    date: String,
    /// `YYYY-MM-DDTHH:MM:SSZ` for `dcterms:modified`.
    modified: String,
}

/// Write the chapters to an EPUB 3 file at `path`.
///
/// Images referenced by chapters are downloaded through `fetcher`; a failed image is
/// logged and left as a remote reference. Fails before creating the file when there
/// are no chapters or the metadata lacks a title or author.
pub fn write_epub(
    chapters: &[Chapter],
    metadata: &BookMetadata,
    path: &Path,
    fetcher: &mut dyn PageFetcher,
) -> Result<(), EpubError> {
    validate(chapters, metadata)?;

    let now = chrono::Utc::now();
    let layout = Layout {
        metadata,
        arcs: group_by_arc(chapters),
        images: download_images(chapters, fetcher),
        date: now.format("%Y-%m-%d").to_string(),
        modified: now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    };

    let path = path.to_path_buf();
    let file = std::fs::File::create(&path).map_err(|e| EpubError::CreateFile {
        path: path.clone(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(file);

    let options_stored = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    let options_deflate = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    // Mimetype must be the first entry and uncompressed.
    zip.start_file("mimetype", options_stored)?;
    zip.write_all(MIMETYPE)?;

    zip.start_file("META-INF/container.xml", options_deflate)?;
    zip.write_all(CONTAINER_XML)?;

    write_entry(&mut zip, "content.opf", &package_document(&layout), options_deflate)?;
    write_entry(&mut zip, "nav.xhtml", &nav_document(&layout), options_deflate)?;
    write_entry(&mut zip, "toc.ncx", &ncx_document(&layout), options_deflate)?;
    write_entry(&mut zip, "style.css", STYLE_CSS, options_deflate)?;
    write_entry(&mut zip, "title.xhtml", &title_page(metadata), options_deflate)?;

    for (i, arc) in layout.arcs.iter().enumerate() {
        write_entry(&mut zip, &arc_href(i), &arc_page(i, arc), options_deflate)?;
        for chapter in &arc.chapters {
            let page = chapter_page(chapter, &layout.images);
            write_entry(&mut zip, &chapter_href(chapter), &page, options_deflate)?;
        }
    }

    // Images are already compressed.
    for image in &layout.images {
        zip.start_file(format!("{}{}", OEBPS_PREFIX, image.href), options_stored)?;
        zip.write_all(&image.data)?;
    }

    zip.finish()?;
    tracing::info!(
        path = %path.display(),
        arcs = layout.arcs.len(),
        chapters = chapters.len(),
        images = layout.images.len(),
        "wrote EPUB"
    );
    Ok(())
}

fn validate(chapters: &[Chapter], metadata: &BookMetadata) -> Result<(), EpubError> {
    if metadata.title.trim().is_empty() {
        return Err(EpubError::EmptyTitle);
    }
    if metadata.author.trim().is_empty() {
        return Err(EpubError::EmptyAuthor);
    }
    if chapters.is_empty() {
        return Err(EpubError::NoChapters);
    }
    Ok(())
}

fn write_entry(
    zip: &mut ZipWriter<impl Write + Seek>,
    name: &str,
    content: &str,
    options: SimpleFileOptions,
) -> Result<(), EpubError> {
    zip.start_file(format!("{}{}", OEBPS_PREFIX, name), options)?;
    zip.write_all(content.as_bytes())?;
    Ok(())
}

fn arc_href(position: usize) -> String {
    format!("arc-{}.xhtml", position + 1)
}

fn chapter_id(chapter: &Chapter) -> String {
    format!("chapter-{}", chapter.sequence_index + 1)
}

fn chapter_href(chapter: &Chapter) -> String {
    format!("{}.xhtml", chapter_id(chapter))
}

fn package_document(layout: &Layout<'_>) -> String {
    let meta = layout.metadata;
    let mut manifest = String::from(
        r#"    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="style" href="style.css" media-type="text/css"/>
    <item id="title-page" href="title.xhtml" media-type="application/xhtml+xml"/>
"#,
    );
    let mut spine = String::from("    <itemref idref=\"title-page\"/>\n");
    for (i, arc) in layout.arcs.iter().enumerate() {
        manifest.push_str(&format!(
            "    <item id=\"arc-{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
            i + 1,
            arc_href(i)
        ));
        spine.push_str(&format!("    <itemref idref=\"arc-{}\"/>\n", i + 1));
        for chapter in &arc.chapters {
            manifest.push_str(&format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
                chapter_id(chapter),
                chapter_href(chapter)
            ));
            spine.push_str(&format!("    <itemref idref=\"{}\"/>\n", chapter_id(chapter)));
        }
    }
    for (i, image) in layout.images.iter().enumerate() {
        manifest.push_str(&format!(
            "    <item id=\"img-{}\" href=\"{}\" media-type=\"{}\"/>\n",
            i + 1,
            xml_escape(&image.href),
            image.media_type
        ));
    }

    let description_el = meta
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(|d| format!("    <dc:description>{}</dc:description>\n", xml_escape(d)))
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="book-id" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="book-id">{id}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:creator>{creator}</dc:creator>
    <dc:language>{language}</dc:language>
{description_el}    <dc:date>{date}</dc:date>
    <meta property="dcterms:modified">{modified}</meta>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>
"#,
        id = xml_escape(&meta.identifier),
        title = xml_escape(&meta.title),
        creator = xml_escape(&meta.author),
        language = xml_escape(&meta.language),
        description_el = description_el,
        date = layout.date,
        modified = layout.modified,
        manifest = manifest,
        spine = spine,
    )
}

fn nav_document(layout: &Layout<'_>) -> String {
    let mut items = String::new();
    for (i, arc) in layout.arcs.iter().enumerate() {
        items.push_str(&format!(
            "      <li><a href=\"{}\">{}</a>\n        <ol>\n",
            arc_href(i),
            xml_escape(arc.label)
        ));
        for chapter in &arc.chapters {
            items.push_str(&format!(
                "          <li><a href=\"{}\">{}</a></li>\n",
                chapter_href(chapter),
                xml_escape(&chapter.title)
            ));
        }
        items.push_str("        </ol>\n      </li>\n");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{lang}" xml:lang="{lang}">
<head>
  <meta charset="UTF-8"/>
  <title>Table of Contents</title>
  <link rel="stylesheet" type="text/css" href="style.css"/>
</head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>Contents</h1>
    <ol>
{items}    </ol>
  </nav>
</body>
</html>
"#,
        lang = xml_escape(&layout.metadata.language),
        items = items
    )
}

fn ncx_document(layout: &Layout<'_>) -> String {
    let mut nav_points = String::new();
    let mut play_order = 0;
    for (i, arc) in layout.arcs.iter().enumerate() {
        play_order += 1;
        nav_points.push_str(&format!(
            r#"    <navPoint id="navpoint-arc-{n}" playOrder="{order}">
      <navLabel><text>{label}</text></navLabel>
      <content src="{href}"/>
"#,
            n = i + 1,
            order = play_order,
            label = xml_escape(arc.label),
            href = arc_href(i)
        ));
        for chapter in &arc.chapters {
            play_order += 1;
            nav_points.push_str(&format!(
                r#"      <navPoint id="navpoint-{id}" playOrder="{order}">
        <navLabel><text>{label}</text></navLabel>
        <content src="{href}"/>
      </navPoint>
"#,
                id = chapter_id(chapter),
                order = play_order,
                label = xml_escape(&chapter.title),
                href = chapter_href(chapter)
            ));
        }
        nav_points.push_str("    </navPoint>\n");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{uid}"/>
    <meta name="dtb:depth" content="2"/>
  </head>
  <docTitle>
    <text>{title}</text>
  </docTitle>
  <navMap>
{nav_points}  </navMap>
</ncx>
"#,
        uid = xml_escape(&layout.metadata.identifier),
        title = xml_escape(&layout.metadata.title),
        nav_points = nav_points
    )
}

fn xhtml_document(title: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <meta charset="UTF-8"/>
  <title>{}</title>
  <link rel="stylesheet" type="text/css" href="style.css"/>
</head>
<body>
{}
</body>
</html>
"#,
        xml_escape(title),
        body
    )
}

fn title_page(metadata: &BookMetadata) -> String {
    let body = format!(
        "  <h1 class=\"book-title\">{}</h1>",
        xml_escape(&metadata.title)
    );
    xhtml_document(&metadata.title, &body)
}

fn arc_page(position: usize, arc: &ArcGroup<'_>) -> String {
    let body = format!(
        "  <h1>Arc {}: {}</h1>",
        position + 1,
        xml_escape(arc.label)
    );
    xhtml_document(arc.label, &body)
}

fn chapter_page(chapter: &Chapter, images: &[EmbeddedImage]) -> String {
    let body = format!(
        "  <h1>{}</h1>\n  <div class=\"chapter-content\">\n{}\n  </div>",
        xml_escape(&chapter.title),
        rewrite_image_sources(&chapter.body_html, images)
    );
    xhtml_document(&chapter.title, &body)
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
