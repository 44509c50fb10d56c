use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::chapter_to_download::Chapter;
use crate::error::DownloadError;

/// Turns fetched pages into titles, chapter lists and image URLs.
///
/// Implementations work on the raw HTML so the parsed document never has to
/// live across an await point.
pub trait ChapterExtractor: Send + Sync {
    /// Missing title structure is an error; the caller treats it as fatal.
    fn extract_title(&self, page: &str) -> Result<String, DownloadError>;

    /// Chapters in chronological order (oldest first). Empty when nothing matches.
    fn extract_chapters(&self, page: &str) -> Vec<Chapter>;

    /// Image URLs in reading order. Empty when nothing matches.
    fn extract_image_urls(&self, page: &str) -> Vec<String>;
}

static TRAILING_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\d{2}/\d{2}/\d{4}$").expect("valid date regex"));

/// Selectors for the mangaonline.biz page layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct MangaOnlineExtractor;

impl MangaOnlineExtractor {
    fn selector(css: &str) -> Result<Selector, DownloadError> {
        Selector::parse(css)
            .map_err(|_| DownloadError::SelectorError(format!("Failed to parse {} selector", css)))
    }
}

impl ChapterExtractor for MangaOnlineExtractor {
    fn extract_title(&self, page: &str) -> Result<String, DownloadError> {
        let document = Html::parse_document(page);
        let title_selector = Self::selector("div.sheader > div > h1")?;

        let title = document
            .select(&title_selector)
            .next()
            .ok_or_else(|| DownloadError::ElementNotFound(String::from("Could not find manga title on page")))?;

        let title = title.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            return Err(DownloadError::ElementNotFound(String::from("Manga title is empty")));
        }
        Ok(title)
    }

    fn extract_chapters(&self, page: &str) -> Vec<Chapter> {
        let (Ok(entry_selector), Ok(link_selector)) = (Self::selector("div.episodiotitle"), Self::selector("a")) else {
            return Vec::new();
        };
        let document = Html::parse_document(page);

        let mut chapters = document
            .select(&entry_selector)
            .filter_map(|entry| {
                let link = entry.select(&link_selector).next()?;
                let text = link.text().collect::<String>();
                let title = TRAILING_DATE.replace(text.trim_end(), "").trim().to_string();
                let url = link.attr("href")?.trim().to_string();
                if title.is_empty() || url.is_empty() {
                    return None;
                }
                Some(Chapter::new(title, url))
            })
            .collect::<Vec<_>>();

        // The site lists newest first
        chapters.reverse();
        chapters
    }

    fn extract_image_urls(&self, page: &str) -> Vec<String> {
        let Ok(images_selector) = Self::selector("div.content > p > img") else {
            return Vec::new();
        };
        let document = Html::parse_document(page);

        document
            .select(&images_selector)
            .filter_map(|e| e.attr("src"))
            .map(|src| src.trim().to_string())
            .filter(|src| !src.is_empty())
            .collect()
    }
}
