use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use clap::Parser;
use regex::Regex;

use crate::error::DownloadError;
use crate::fetcher::RetryPolicy;
use crate::prompt::Prompter;
use crate::scheduler::MAX_WORKERS;

pub const DEFAULT_OUTPUT_DIR: &str = "manga_downloads";
pub const DEFAULT_MAX_WORKERS: usize = 3;

static MANGA_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://mangaonline\.biz/manga/[^/]+/$").expect("valid manga url regex"));

/// Download a manga from https://mangaonline.biz as image folders and CBZ archives
#[derive(Debug, Parser)]
#[command(version, about, long_about = "Download a manga from https://mangaonline.biz as image folders and CBZ archives.\nAnything not given on the command line is asked interactively.")]
pub struct Args {
    /// The manga URL, e.g. https://mangaonline.biz/manga/<slug>/
    #[arg(short, long)]
    pub link: Option<String>,

    /// The output directory
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Create a CBZ archive per chapter
    #[arg(long, value_name = "BOOL")]
    pub cbz: Option<bool>,

    /// Remove image folders after the CBZ is created
    #[arg(long, value_name = "BOOL")]
    pub clean: Option<bool>,

    /// Download all chapters (false downloads only the first one)
    #[arg(long, value_name = "BOOL")]
    pub all: Option<bool>,

    /// Start from this chapter number (e.g. 12 or 12.5)
    #[arg(short, long)]
    pub start_chapter: Option<String>,

    /// Number of chapters downloaded at the same time (1-10)
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Attempts per request before giving up
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Pause between attempts, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub retry_delay_ms: u64,

    /// Write a JSON report of every chapter outcome to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Do not ask anything; use defaults for missing values
    #[arg(short, long)]
    pub yes: bool,
}

/// Validated settings for one run. Never changes once built.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadConfig {
    pub manga_url: String,
    pub output_dir: PathBuf,
    pub create_archive: bool,
    pub clean_folders: bool,
    pub download_all: bool,
    pub start_chapter: Option<f64>,
    pub max_workers: usize,
    pub retry: RetryPolicy,
    pub report: Option<PathBuf>,
}

impl DownloadConfig {
    /// Defaults for everything but the URL, which is taken as is.
    pub fn new(manga_url: impl Into<String>) -> Self {
        Self {
            manga_url: manga_url.into(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            create_archive: true,
            clean_folders: false,
            download_all: true,
            start_chapter: None,
            max_workers: DEFAULT_MAX_WORKERS,
            retry: RetryPolicy::default(),
            report: None,
        }
    }

    /// Builds the configuration from command-line arguments, asking for
    /// whatever is missing unless `--yes` was given.
    pub fn resolve<R: BufRead, W: Write>(args: Args, prompter: &mut Prompter<R, W>) -> Result<Self, DownloadError> {
        let interactive = !args.yes;

        let manga_url = match args.link {
            Some(link) => validate_manga_url(&link)?,
            None if interactive => prompter.text("Enter the Manga Online URL", "", validate_manga_url)?,
            None => return Err(DownloadError::InvalidConfig(String::from("--link is required with --yes"))),
        };

        let create_archive = match args.cbz {
            Some(value) => value,
            None if interactive => prompter.confirm("Create CBZ files for chapters?", true)?,
            None => true,
        };

        let clean_folders = match args.clean {
            Some(value) => value,
            None if interactive && create_archive => {
                prompter.confirm("Remove image folders after CBZ creation?", false)?
            }
            None => false,
        };

        let download_all = match args.all {
            Some(value) => value,
            None if interactive => prompter.confirm("Download all chapters?", true)?,
            None => true,
        };

        let start_chapter = match args.start_chapter {
            Some(value) => parse_start_chapter(&value)?,
            None if interactive => prompter.text(
                "Start from chapter number (leave empty for first)",
                "",
                parse_start_chapter,
            )?,
            None => None,
        };

        let max_workers = match args.concurrency {
            Some(value) => validate_max_workers(value)?,
            None if interactive => prompter.text(
                "Number of concurrent downloads (1-10)",
                &DEFAULT_MAX_WORKERS.to_string(),
                parse_max_workers,
            )?,
            None => DEFAULT_MAX_WORKERS,
        };

        if args.retries == 0 {
            return Err(DownloadError::InvalidConfig(String::from("--retries must be at least 1")));
        }

        Ok(Self {
            manga_url,
            output_dir: args.output_dir,
            create_archive,
            clean_folders,
            download_all,
            start_chapter,
            max_workers,
            retry: RetryPolicy::new(args.retries, Duration::from_millis(args.retry_delay_ms)),
            report: args.report,
        })
    }
}

pub fn validate_manga_url(url: &str) -> Result<String, DownloadError> {
    let url = url.trim();
    if MANGA_URL.is_match(url) {
        Ok(url.to_string())
    } else {
        Err(DownloadError::InvalidConfig(format!(
            "'{}' is not a manga URL like https://mangaonline.biz/manga/<name>/",
            url
        )))
    }
}

pub fn parse_max_workers(input: &str) -> Result<usize, DownloadError> {
    let workers = input
        .trim()
        .parse::<usize>()
        .map_err(|_| DownloadError::InvalidConfig(format!("'{}' is not a whole number", input.trim())))?;
    validate_max_workers(workers)
}

pub fn validate_max_workers(workers: usize) -> Result<usize, DownloadError> {
    if (1..=MAX_WORKERS).contains(&workers) {
        Ok(workers)
    } else {
        Err(DownloadError::InvalidConfig(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_WORKERS, workers
        )))
    }
}

/// Empty input means no filter.
pub fn parse_start_chapter(input: &str) -> Result<Option<f64>, DownloadError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    match input.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(Some(number)),
        _ => Err(DownloadError::InvalidConfig(String::from("Invalid chapter number format"))),
    }
}
