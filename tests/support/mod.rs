//! Local stand-in for the serial's WordPress site, served by tiny_http.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

pub static PIXEL_PNG: &[u8] = &[
    137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13, 73, 72, 68, 82, 0, 0, 0, 1, 0, 0, 0, 1, 8, 4, 0,
    0, 0, 181, 28, 12, 2, 0, 0, 0, 11, 73, 68, 65, 84, 120, 218, 99, 252, 255, 23, 0, 2, 3, 1, 128,
    110, 220, 25, 0, 0, 0, 0, 73, 69, 78, 68, 174, 66, 96, 130,
];

/// One canned response.
#[derive(Clone)]
pub struct Resource {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Resource {
    pub fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.into_bytes(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: format!("status {}", status).into_bytes(),
        }
    }

    pub fn png() -> Self {
        Self {
            status: 200,
            content_type: "image/png",
            body: PIXEL_PNG.to_vec(),
        }
    }
}

/// Running server; stops when dropped.
pub struct SerialServer {
    pub base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    shutdown: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SerialServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Number of requests received for `path` so far.
    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .map(|h| h.get(path).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl Drop for SerialServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Serve `routes` (path -> resource) on an ephemeral port. Unknown paths are 404.
/// `routes` receives the base URL so pages can link to each other.
pub fn spawn_server(routes: impl FnOnce(&str) -> HashMap<String, Resource>) -> SerialServer {
    spawn_sequenced_server(|base| {
        routes(base)
            .into_iter()
            .map(|(path, resource)| (path, vec![resource]))
            .collect()
    })
}

/// Like [spawn_server], but each path answers with its responses in order.
/// The last response repeats once the sequence is used up.
pub fn spawn_sequenced_server(
    routes: impl FnOnce(&str) -> HashMap<String, Vec<Resource>>,
) -> SerialServer {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let base_url = format!("http://{}", server.server_addr());
    let routes = routes(&base_url);
    let hits = Arc::new(Mutex::new(HashMap::<String, usize>::new()));
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let counter = Arc::clone(&hits);
    let handle = thread::spawn(move || loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }
        let request = match server.recv_timeout(Duration::from_millis(50)) {
            Ok(Some(req)) => req,
            Ok(None) => continue,
            Err(_) => break,
        };
        let path = request.url().split('?').next().unwrap_or("").to_string();
        let seen = {
            let mut hits = counter.lock().expect("hit counter");
            let n = hits.entry(path.clone()).or_insert(0);
            *n += 1;
            *n
        };
        let resource = routes
            .get(&path)
            .and_then(|seq| seq.get(seen - 1).or_else(|| seq.last()))
            .cloned()
            .unwrap_or(Resource {
                status: 404,
                content_type: "text/plain",
                body: b"not found".to_vec(),
            });
        let header =
            tiny_http::Header::from_bytes(&b"Content-Type"[..], resource.content_type.as_bytes())
                .expect("build header");
        let response = tiny_http::Response::from_data(resource.body)
            .with_status_code(resource.status)
            .with_header(header);
        let _ = request.respond(response);
    });

    SerialServer {
        base_url,
        hits,
        shutdown: shutdown_tx,
        handle: Some(handle),
    }
}

/// A chapter page in the serial's layout: navigation paragraph, story paragraphs,
/// navigation paragraph. A missing `next` renders the label without a link.
pub fn chapter_page(
    label: &str,
    arc: &str,
    prev: Option<&str>,
    next: Option<&str>,
    paragraphs: &[&str],
) -> String {
    let prev = prev
        .map(|p| format!(r#"<a href="{}"><strong>Previous Chapter</strong></a>"#, p))
        .unwrap_or_default();
    let next = next
        .map(|n| format!(r#"<a href="{}"><strong>Next Chapter</strong></a>"#, n))
        .unwrap_or_else(|| "<strong>Next Chapter</strong>".to_string());
    let nav = format!("<p>{} | {}</p>", prev, next);
    let body: String = paragraphs.iter().map(|p| format!("<p>{}</p>\n", p)).collect();
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{label} – {arc} – SEEK</title></head>
<body>
<article>
<div class="entry-content">
{nav}
{body}{nav}
</div>
</article>
</body>
</html>
"#
    )
}

/// Paths `/ch-1/` .. `/ch-n/`.
pub fn chapter_path(n: usize) -> String {
    format!("/ch-{}/", n)
}

/// The serial used by most tests: two HACK chapters and one MUTE chapter.
/// Word counts: 5, 4, 6. The MUTE chapter embeds `/img/art.png`.
pub fn three_chapter_serial(base: &str) -> HashMap<String, Resource> {
    let url = |n: usize| format!("{}{}", base, chapter_path(n));
    let mut routes = HashMap::new();
    routes.insert(
        chapter_path(1),
        Resource::html(chapter_page(
            "0.1.0",
            "HACK",
            None,
            Some(&url(2)),
            &["one two three", "four five"],
        )),
    );
    routes.insert(
        chapter_path(2),
        Resource::html(chapter_page(
            "0.1.1",
            "HACK",
            Some(&url(1)),
            Some(&url(3)),
            &["six seven eight nine"],
        )),
    );
    routes.insert(
        chapter_path(3),
        Resource::html(chapter_page(
            "0.2.1",
            "MUTE",
            Some(&url(2)),
            None,
            &[
                r#"<img src="/img/art.png?w=600" alt="art"/>"#,
                "ten eleven twelve",
                "thirteen fourteen fifteen",
            ],
        )),
    );
    routes.insert("/img/art.png".to_string(), Resource::png());
    routes
}
