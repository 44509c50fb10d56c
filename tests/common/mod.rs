#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use mangaonline_dl::{DownloadContext, Fetcher, MangaOnlineExtractor, RetryPolicy};

pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Retries without pauses so failing mocks don't slow the suite down.
pub fn test_context() -> DownloadContext {
    DownloadContext::new(
        Fetcher::new().unwrap(),
        RetryPolicy::new(3, Duration::ZERO),
        Arc::new(MangaOnlineExtractor),
    )
}

/// Manga page in the site's layout. `chapters` is given oldest first and
/// rendered newest first, like the site does.
pub fn manga_page(title: &str, chapters: &[(&str, String)]) -> String {
    let entries = chapters
        .iter()
        .rev()
        .map(|(name, url)| format!(r#"<li><div class="episodiotitle"><a href="{}">{} 01/02/2024</a></div></li>"#, url, name))
        .collect::<String>();
    format!(
        r#"<html><body><div class="sheader"><div class="data"><h1>{}</h1></div></div><ul>{}</ul></body></html>"#,
        title, entries
    )
}

pub fn chapter_page(image_urls: &[String]) -> String {
    let images = image_urls
        .iter()
        .map(|url| format!(r#"<p><img src="{}"></p>"#, url))
        .collect::<String>();
    format!(r#"<html><body><div class="content">{}</div></body></html>"#, images)
}

pub async fn mock_html(server: &mut mockito::ServerGuard, path: &str, body: String, hits: usize) -> mockito::Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

pub async fn mock_image(server: &mut mockito::ServerGuard, path: &str, hits: usize) -> mockito::Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(PNG_BYTES)
        .expect(hits)
        .create_async()
        .await
}
