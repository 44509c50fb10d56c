// Expose modules for integration testing
pub mod archive;
pub mod chapter_to_download;
pub mod config;
pub mod downloader;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod manga_to_download;
pub mod progress;
pub mod prompt;
pub mod scheduler;

// Re-export important types for easier use in tests
pub use chapter_to_download::{Chapter, ChapterJob, DownloadContext, DownloadOutcome, download_chapter};
pub use config::{Args, DownloadConfig};
pub use error::DownloadError;
pub use extractor::{ChapterExtractor, MangaOnlineExtractor};
pub use fetcher::{Fetcher, RetryPolicy};
pub use manga_to_download::MangaToDownload;
pub use progress::{ProgressCounter, ProgressMode};
pub use scheduler::{BatchReport, ChapterReport, run_batch};
