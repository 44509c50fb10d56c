use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, stream};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use serde::Serialize;

use crate::chapter_to_download::{ChapterJob, DownloadContext, DownloadOutcome, download_chapter};
use crate::error::DownloadError;
use crate::progress::{ProgressCounter, ProgressMode};

pub const MAX_WORKERS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterReport {
    pub title: String,
    pub outcome: DownloadOutcome,
}

/// Per-chapter outcomes of one batch. Concurrent runs list chapters in
/// completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub chapters: Vec<ChapterReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, DownloadOutcome::Success { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DownloadOutcome::Skipped))
    }

    pub fn failed(&self) -> Vec<&ChapterReport> {
        self.chapters.iter().filter(|c| c.outcome.is_failure()).collect()
    }

    pub fn images_downloaded(&self) -> usize {
        self.chapters
            .iter()
            .map(|c| match c.outcome {
                DownloadOutcome::Success { images } => images,
                _ => 0,
            })
            .sum()
    }

    /// Writes the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), DownloadError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    fn count(&self, predicate: impl Fn(&DownloadOutcome) -> bool) -> usize {
        self.chapters.iter().filter(|c| predicate(&c.outcome)).count()
    }
}

/// Downloads every job and collects one outcome per chapter.
///
/// With a single worker, chapters run one after another in the given order
/// with a bar per chapter. With more, a counting pass fetches every chapter
/// page first to size the global bar, then up to `min(max_workers, 10)`
/// chapters download at once. A failing chapter never stops the others.
pub async fn run_batch(ctx: &DownloadContext, jobs: Vec<ChapterJob>, max_workers: usize) -> BatchReport {
    let workers = max_workers.clamp(1, MAX_WORKERS);
    if workers == 1 {
        run_sequential(ctx, jobs, &ProgressMode::PerChapter).await
    } else {
        run_concurrent(ctx, jobs, workers).await
    }
}

pub async fn run_sequential(ctx: &DownloadContext, jobs: Vec<ChapterJob>, progress: &ProgressMode) -> BatchReport {
    let mut report = BatchReport::default();
    for job in jobs {
        let title = job.chapter.title.clone();
        let outcome = download_chapter(ctx, job, progress).await;
        if outcome.is_failure() {
            progress.report_error(format!("Failed to download chapter {}", title));
        }
        report.chapters.push(ChapterReport { title, outcome });
    }
    report
}

async fn run_concurrent(ctx: &DownloadContext, mut jobs: Vec<ChapterJob>, workers: usize) -> BatchReport {
    let total = count_images(ctx, &mut jobs).await;
    let counter = Arc::new(ProgressCounter::with_bar(total));
    let progress = ProgressMode::Shared(Arc::clone(&counter));

    let chapters = stream::iter(jobs)
        .map(|job| {
            let progress = progress.clone();
            async move {
                let title = job.chapter.title.clone();
                let outcome = download_chapter(ctx, job, &progress).await;
                if outcome.is_failure() {
                    progress.report_error(format!("Failed to download chapter {}", title));
                }
                ChapterReport { title, outcome }
            }
        })
        .buffer_unordered(workers.clamp(1, MAX_WORKERS))
        .collect::<Vec<_>>()
        .await;

    counter.finish();
    BatchReport { chapters }
}

/// Fetches the image list of every chapter that still needs downloading,
/// stores it on the job and returns the total image count.
async fn count_images(ctx: &DownloadContext, jobs: &mut [ChapterJob]) -> u64 {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋ ", "⠙ ", "⠹ ", "⠸ ", "⠼ ", "⠴ ", "⠦ ", "⠧ ", "⠇ ", "⠏ "]),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut total = 0u64;
    let count = jobs.len();
    for (i, job) in jobs.iter_mut().enumerate() {
        if job.images.is_some() || job.is_already_downloaded() {
            continue;
        }
        spinner.set_message(format!("Counting images [{}/{}] {}", i + 1, count, job.chapter.title));
        match ctx.chapter_images(&job.chapter).await {
            Ok(images) => {
                debug!("{}: {} images", job.chapter.title, images.len());
                total += images.len() as u64;
                job.images = Some(images);
            }
            // Left unset so the worker fetches again and reports the failure
            Err(e) => warn!("could not count images of {}: {}", job.chapter.title, e),
        }
    }
    spinner.finish_and_clear();
    total
}
