use std::sync::LazyLock;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use regex::Regex;

use crate::chapter_to_download::{Chapter, ChapterJob, DownloadContext};
use crate::config::DownloadConfig;
use crate::downloader::{build_chapter_path, ensure_dir_exists};
use crate::error::DownloadError;
use crate::scheduler::{BatchReport, run_batch};

static CHAPTER_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.?\d*").expect("valid chapter number regex"));

pub struct MangaToDownload {
    pub link: String,
    pub title: String,
    /// Oldest first.
    pub chapters: Vec<Chapter>,
}

impl MangaToDownload {
    /// Fetches the manga page and extracts its title and chapter list.
    /// A page without a title is an error.
    pub async fn new(ctx: &DownloadContext, link: &str) -> Result<Self, DownloadError> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋ ", "⠙ ", "⠹ ", "⠸ ", "⠼ ", "⠴ ", "⠦ ", "⠧ ", "⠇ ", "⠏ "]),
        );
        spinner.set_message(format!("Fetching manga page: {}", link));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let page = match ctx.fetcher.fetch_text_with_retry(link, &ctx.retry).await {
            Ok(page) => page,
            Err(e) => {
                spinner.abandon_with_message(format!("✗ Error fetching manga page: {}", e));
                return Err(e);
            }
        };

        spinner.set_message("Processing manga title...");
        let title = match ctx.extractor.extract_title(&page) {
            Ok(title) => title,
            Err(e) => {
                spinner.abandon_with_message("✗ Could not find manga title on page");
                return Err(e);
            }
        };

        let chapters = ctx.extractor.extract_chapters(&page);
        spinner.finish_with_message(format!("✓ Found manga: {} ({} chapters)", title, chapters.len()));

        Ok(Self {
            link: link.to_string(),
            title,
            chapters,
        })
    }
}

/// First number in a chapter title: `"Chapter 12.5"` gives `12.5`.
pub fn chapter_number(title: &str) -> Option<f64> {
    CHAPTER_NUMBER.find(title)?.as_str().parse().ok()
}

/// Keeps the chapters numbered `start` or higher, in their original order.
///
/// Every title has to carry a number; one that does not makes the whole
/// filter fail.
pub fn filter_from_chapter(chapters: Vec<Chapter>, start: f64) -> Result<Vec<Chapter>, DownloadError> {
    let mut kept = Vec::with_capacity(chapters.len());
    for chapter in chapters {
        let number = chapter_number(&chapter.title).ok_or_else(|| {
            DownloadError::InvalidConfig(format!("Invalid chapter number format in '{}'", chapter.title))
        })?;
        if number >= start {
            kept.push(chapter);
        }
    }
    Ok(kept)
}

/// Whole run: manga page, chapter selection, batch download.
///
/// Only setup failures are returned as errors; chapter failures end up in
/// the report.
pub async fn run(config: &DownloadConfig, ctx: &DownloadContext) -> Result<BatchReport, DownloadError> {
    ensure_dir_exists(&config.output_dir)?;

    let manga = MangaToDownload::new(ctx, &config.manga_url).await?;
    println!("Manga: {}", manga.title);

    let manga_dir = build_chapter_path(&config.output_dir, &manga.title);
    ensure_dir_exists(&manga_dir)?;

    let mut chapters = manga.chapters;
    if chapters.is_empty() {
        return Err(DownloadError::ElementNotFound(String::from("No chapters found")));
    }

    if let Some(start) = config.start_chapter {
        chapters = filter_from_chapter(chapters, start)?;
    }

    if !config.download_all {
        chapters.truncate(1);
    }

    info!("{} chapters selected, {} workers", chapters.len(), config.max_workers);
    let jobs = chapters
        .into_iter()
        .map(|chapter| ChapterJob::new(chapter, &manga_dir, config.create_archive, config.clean_folders))
        .collect::<Vec<_>>();

    Ok(run_batch(ctx, jobs, config.max_workers).await)
}
