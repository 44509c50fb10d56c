use std::process;
use std::sync::Arc;

use clap::Parser;
use env_logger::Env;

use mangaonline_dl::manga_to_download;
use mangaonline_dl::prompt::Prompter;
use mangaonline_dl::{
    Args, BatchReport, DownloadConfig, DownloadContext, DownloadError, DownloadOutcome, Fetcher, MangaOnlineExtractor,
};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    println!("\n=== Manga Online Downloader ===\n");

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), DownloadError> {
    let config = DownloadConfig::resolve(args, &mut Prompter::stdio())?;
    let ctx = DownloadContext::new(Fetcher::new()?, config.retry, Arc::new(MangaOnlineExtractor));

    // Dropping the download future on Ctrl-C stops any new work from starting
    let report = tokio::select! {
        result = manga_to_download::run(&config, &ctx) => result?,
        Ok(()) = tokio::signal::ctrl_c() => {
            eprintln!("\nDownload canceled by user");
            process::exit(1);
        }
    };

    print_summary(&report);

    if let Some(path) = &config.report {
        report.write_json(path)?;
        println!("Report written to {}", path.display());
    }

    println!("\nDownload completed!");
    Ok(())
}

fn print_summary(report: &BatchReport) {
    println!(
        "\n{} chapters downloaded ({} images), {} skipped, {} failed",
        report.succeeded(),
        report.images_downloaded(),
        report.skipped(),
        report.failed().len()
    );

    for chapter in report.failed() {
        if let DownloadOutcome::Failed { reason } = &chapter.outcome {
            eprintln!("  ✗ {}: {}", chapter.title, reason);
        }
    }
}
