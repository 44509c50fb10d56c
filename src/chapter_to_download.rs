use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;

use crate::archive::create_chapter_cbz;
use crate::downloader::{build_archive_path, build_chapter_path, image_file_name, resolve_url};
use crate::error::DownloadError;
use crate::extractor::ChapterExtractor;
use crate::fetcher::{Fetcher, RetryPolicy};
use crate::progress::ProgressMode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chapter {
    /// Display name as shown on the site, not filesystem-safe.
    pub title: String,
    pub url: String,
}

impl Chapter {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self { title: title.into(), url: url.into() }
    }
}

/// Everything a worker needs to download one chapter.
#[derive(Debug, Clone)]
pub struct ChapterJob {
    pub chapter: Chapter,
    /// The manga folder; the chapter gets its own sub-directory in it.
    pub target_dir: PathBuf,
    pub create_archive: bool,
    pub clean_after_archive: bool,
    /// Image URLs already fetched by the scheduler's counting pass.
    pub images: Option<Vec<String>>,
}

impl ChapterJob {
    pub fn new(chapter: Chapter, target_dir: impl Into<PathBuf>, create_archive: bool, clean_after_archive: bool) -> Self {
        Self {
            chapter,
            target_dir: target_dir.into(),
            create_archive,
            clean_after_archive,
            images: None,
        }
    }

    pub fn chapter_dir(&self) -> PathBuf {
        build_chapter_path(&self.target_dir, &self.chapter.title)
    }

    pub fn archive_path(&self) -> PathBuf {
        build_archive_path(&self.target_dir, &self.chapter.title)
    }

    /// A chapter counts as done when its folder or its archive exists.
    /// The folder's contents are not verified.
    pub fn is_already_downloaded(&self) -> bool {
        self.chapter_dir().exists() || self.archive_path().exists()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadOutcome {
    Skipped,
    Success { images: usize },
    Failed { reason: String },
}

impl DownloadOutcome {
    fn failed(reason: impl Into<String>) -> Self {
        DownloadOutcome::Failed { reason: reason.into() }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DownloadOutcome::Failed { .. })
    }
}

/// Shared, read-only collaborators of every chapter download.
#[derive(Clone)]
pub struct DownloadContext {
    pub fetcher: Fetcher,
    pub retry: RetryPolicy,
    pub extractor: Arc<dyn ChapterExtractor>,
}

impl DownloadContext {
    pub fn new(fetcher: Fetcher, retry: RetryPolicy, extractor: Arc<dyn ChapterExtractor>) -> Self {
        Self { fetcher, retry, extractor }
    }

    /// Fetches a chapter page and returns its absolute image URLs.
    pub async fn chapter_images(&self, chapter: &Chapter) -> Result<Vec<String>, DownloadError> {
        let page = self.fetcher.fetch_text_with_retry(&chapter.url, &self.retry).await?;
        Ok(self
            .extractor
            .extract_image_urls(&page)
            .into_iter()
            .map(|src| resolve_url(&chapter.url, &src))
            .collect())
    }
}

/// Downloads every image of `job` into its chapter folder.
///
/// Never returns an error: whatever goes wrong is reported on stderr and
/// becomes [`DownloadOutcome::Failed`]. A folder left behind by a failed
/// image stays on disk.
pub async fn download_chapter(ctx: &DownloadContext, job: ChapterJob, progress: &ProgressMode) -> DownloadOutcome {
    let chapter = &job.chapter;
    let chapter_dir = job.chapter_dir();

    if job.is_already_downloaded() {
        if progress.is_verbose() {
            println!("Chapter '{}' already exists - skipping", chapter.title);
        }
        return DownloadOutcome::Skipped;
    }

    if progress.is_verbose() {
        println!("\nDownloading chapter: {}", chapter.title);
    }

    let images = match job.images.clone() {
        Some(images) => images,
        None => match ctx.chapter_images(chapter).await {
            Ok(images) => images,
            Err(e) => {
                progress.report_error(format!("Error getting images for chapter {}: {}", chapter.url, e));
                return DownloadOutcome::failed(format!("could not load chapter page: {}", e));
            }
        },
    };

    if images.is_empty() {
        progress.report_error(format!("No images found for chapter {}", chapter.title));
        return DownloadOutcome::failed("no images");
    }

    if let Err(e) = tokio::fs::create_dir_all(&chapter_dir).await {
        progress.report_error(format!("Error creating directory {}: {}", chapter_dir.display(), e));
        return DownloadOutcome::failed(format!("io error: {}", e));
    }

    let bar = progress.chapter_bar(&chapter.title, images.len());
    for (index, url) in images.iter().enumerate() {
        let path = chapter_dir.join(image_file_name(index, url));
        if let Err(e) = download_image(ctx, url, &path).await {
            bar.abandon();
            progress.report_error(format!(
                "Failed to download {} after {} attempts: {}",
                url, ctx.retry.max_attempts, e
            ));
            return DownloadOutcome::failed(format!("image {} failed: {}", index, e));
        }
        bar.inc(1);
        progress.image_done();
    }
    bar.finish_and_clear();

    if job.create_archive {
        if progress.is_verbose() {
            println!("Creating CBZ for {}", chapter.title);
        }
        let archive_path = job.archive_path();
        let clean = job.clean_after_archive;
        let source_dir = chapter_dir.clone();
        let result = tokio::task::spawn_blocking(move || create_chapter_cbz(&source_dir, &archive_path, clean))
            .await
            .unwrap_or_else(|e| Err(DownloadError::ArchiveError(e.to_string())));

        if let Err(e) = result {
            progress.report_error(format!("Error creating CBZ for {}: {}", chapter.title, e));
            return DownloadOutcome::failed(format!("archive error: {}", e));
        }
    }

    info!("chapter '{}' done ({} images)", chapter.title, images.len());
    DownloadOutcome::Success { images: images.len() }
}

async fn download_image(ctx: &DownloadContext, url: &str, path: &Path) -> Result<(), DownloadError> {
    let bytes = ctx.fetcher.fetch_with_retry(url, &ctx.retry).await?;
    tokio::fs::write(path, &bytes).await?;
    debug!("saved {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
