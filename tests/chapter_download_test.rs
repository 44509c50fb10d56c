mod common;

use std::fs;
use std::sync::Arc;

use common::{PNG_BYTES, chapter_page, mock_html, mock_image, test_context};
use mangaonline_dl::downloader::{build_archive_path, build_chapter_path};
use mangaonline_dl::{Chapter, ChapterJob, DownloadOutcome, ProgressCounter, ProgressMode, download_chapter};

#[tokio::test]
async fn downloads_images_in_order_with_url_extensions() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();
    let images = vec![
        format!("{}/img/first.png", base),
        format!("{}/img/second", base),
        format!("{}/img/third.WEBP", base),
    ];
    let page = mock_html(&mut server, "/capitulo/1/", chapter_page(&images), 1).await;
    let first = mock_image(&mut server, "/img/first.png", 1).await;
    let second = mock_image(&mut server, "/img/second", 1).await;
    let third = mock_image(&mut server, "/img/third.WEBP", 1).await;

    let tmp = tempfile::tempdir().unwrap();
    let chapter = Chapter::new("Chapter 1: Start", format!("{}/capitulo/1/", base));
    let job = ChapterJob::new(chapter, tmp.path(), false, false);

    let outcome = download_chapter(&test_context(), job, &ProgressMode::Silent).await;

    assert_eq!(outcome, DownloadOutcome::Success { images: 3 });
    let dir = tmp.path().join("Chapter 1_ Start");
    let mut names = fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect::<Vec<_>>();
    names.sort();
    assert_eq!(names, vec!["0000.png", "0001.jpg", "0002.webp"]);
    assert_eq!(fs::read(dir.join("0000.png")).unwrap(), PNG_BYTES);

    for mock in [page, first, second, third] {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn relative_image_urls_resolve_against_chapter_page() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();
    let page = mock_html(&mut server, "/capitulo/2/", chapter_page(&[String::from("/img/rel.png")]), 1).await;
    let image = mock_image(&mut server, "/img/rel.png", 1).await;

    let tmp = tempfile::tempdir().unwrap();
    let job = ChapterJob::new(Chapter::new("Chapter 2", format!("{}/capitulo/2/", base)), tmp.path(), false, false);

    let outcome = download_chapter(&test_context(), job, &ProgressMode::Silent).await;

    assert_eq!(outcome, DownloadOutcome::Success { images: 1 });
    assert!(tmp.path().join("Chapter 2").join("0000.png").exists());
    page.assert_async().await;
    image.assert_async().await;
}

#[tokio::test]
async fn existing_chapter_directory_is_skipped_without_requests() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();
    let page = mock_html(&mut server, "/capitulo/3/", chapter_page(&[]), 0).await;

    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("Chapter 3")).unwrap();
    let job = ChapterJob::new(Chapter::new("Chapter 3", format!("{}/capitulo/3/", base)), tmp.path(), true, true);

    let outcome = download_chapter(&test_context(), job, &ProgressMode::Silent).await;

    assert_eq!(outcome, DownloadOutcome::Skipped);
    page.assert_async().await;
}

#[tokio::test]
async fn page_without_images_fails_and_creates_nothing() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();
    let page = mock_html(&mut server, "/capitulo/4/", chapter_page(&[]), 1).await;

    let tmp = tempfile::tempdir().unwrap();
    let job = ChapterJob::new(Chapter::new("Chapter 4", format!("{}/capitulo/4/", base)), tmp.path(), false, false);

    let outcome = download_chapter(&test_context(), job, &ProgressMode::Silent).await;

    assert_eq!(outcome, DownloadOutcome::Failed { reason: String::from("no images") });
    assert!(!tmp.path().join("Chapter 4").exists());
    page.assert_async().await;
}

#[tokio::test]
async fn failing_image_aborts_chapter_and_keeps_partial_folder() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();
    let images = vec![
        format!("{}/img/ok.jpg", base),
        format!("{}/img/broken.jpg", base),
        format!("{}/img/never.jpg", base),
    ];
    let _page = mock_html(&mut server, "/capitulo/5/", chapter_page(&images), 1).await;
    let ok = mock_image(&mut server, "/img/ok.jpg", 1).await;
    let broken = server
        .mock("GET", "/img/broken.jpg")
        .with_status(404)
        .expect(3)
        .create_async()
        .await;
    let never = mock_image(&mut server, "/img/never.jpg", 0).await;

    let tmp = tempfile::tempdir().unwrap();
    let job = ChapterJob::new(Chapter::new("Chapter 5", format!("{}/capitulo/5/", base)), tmp.path(), true, false);

    let outcome = download_chapter(&test_context(), job, &ProgressMode::Silent).await;

    assert!(outcome.is_failure());
    let dir = tmp.path().join("Chapter 5");
    assert!(dir.join("0000.jpg").exists());
    assert!(!dir.join("0001.jpg").exists());
    assert!(!tmp.path().join("Chapter 5.cbz").exists());

    ok.assert_async().await;
    broken.assert_async().await;
    never.assert_async().await;
}

#[tokio::test]
async fn shared_progress_counts_every_image() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();
    let images = vec![format!("{}/img/a.png", base), format!("{}/img/b.png", base)];
    let _page = mock_html(&mut server, "/capitulo/6/", chapter_page(&images), 1).await;
    let _a = mock_image(&mut server, "/img/a.png", 1).await;
    let _b = mock_image(&mut server, "/img/b.png", 1).await;

    let tmp = tempfile::tempdir().unwrap();
    let counter = Arc::new(ProgressCounter::new(2));
    let progress = ProgressMode::Shared(Arc::clone(&counter));
    let job = ChapterJob::new(Chapter::new("Chapter 6", format!("{}/capitulo/6/", base)), tmp.path(), false, false);

    let outcome = download_chapter(&test_context(), job, &progress).await;

    assert_eq!(outcome, DownloadOutcome::Success { images: 2 });
    assert_eq!(counter.completed(), 2);
}

#[tokio::test]
async fn prefetched_image_list_skips_chapter_page() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();
    let page = mock_html(&mut server, "/capitulo/7/", chapter_page(&[]), 0).await;
    let image = mock_image(&mut server, "/img/pre.png", 1).await;

    let tmp = tempfile::tempdir().unwrap();
    let mut job = ChapterJob::new(Chapter::new("Chapter 7", format!("{}/capitulo/7/", base)), tmp.path(), true, true);
    job.images = Some(vec![format!("{}/img/pre.png", base)]);

    let outcome = download_chapter(&test_context(), job, &ProgressMode::Silent).await;

    assert_eq!(outcome, DownloadOutcome::Success { images: 1 });
    assert!(tmp.path().join("Chapter 7.cbz").exists());
    assert!(!tmp.path().join("Chapter 7").exists());
    page.assert_async().await;
    image.assert_async().await;
}

#[tokio::test]
async fn archive_failure_keeps_downloaded_images() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();
    let images = vec![format!("{}/img/keep-a.png", base), format!("{}/img/keep-b.png", base)];
    let _page = mock_html(&mut server, "/capitulo/8/", chapter_page(&images), 1).await;
    let _a = mock_image(&mut server, "/img/keep-a.png", 1).await;
    let _b = mock_image(&mut server, "/img/keep-b.png", 1).await;

    let tmp = tempfile::tempdir().unwrap();
    // a directory squatting on the in-progress archive name makes the zip unwritable
    fs::create_dir_all(tmp.path().join("Chapter 8.cbz.part")).unwrap();
    let job = ChapterJob::new(Chapter::new("Chapter 8", format!("{}/capitulo/8/", base)), tmp.path(), true, true);

    let outcome = download_chapter(&test_context(), job, &ProgressMode::Silent).await;

    match &outcome {
        DownloadOutcome::Failed { reason } => assert!(reason.starts_with("archive error"), "{}", reason),
        other => panic!("expected archive failure, got {:?}", other),
    }
    let dir = tmp.path().join("Chapter 8");
    assert_eq!(fs::read(dir.join("0000.png")).unwrap(), PNG_BYTES);
    assert!(dir.join("0001.png").exists());
    assert!(!tmp.path().join("Chapter 8.cbz").exists());
}

#[tokio::test]
async fn very_long_title_is_still_archived() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();
    let _page = mock_html(&mut server, "/capitulo/9/", chapter_page(&[format!("{}/img/long.png", base)]), 1).await;
    let _image = mock_image(&mut server, "/img/long.png", 1).await;

    let tmp = tempfile::tempdir().unwrap();
    let title = format!("Chapter 1 {}", "x".repeat(300));
    let job = ChapterJob::new(Chapter::new(title.clone(), format!("{}/capitulo/9/", base)), tmp.path(), true, false);

    let outcome = download_chapter(&test_context(), job.clone(), &ProgressMode::Silent).await;

    assert_eq!(outcome, DownloadOutcome::Success { images: 1 });
    assert!(build_archive_path(tmp.path(), &title).exists());
    assert!(build_chapter_path(tmp.path(), &title).join("0000.png").exists());

    // a later run sees the finished chapter
    let again = download_chapter(&test_context(), job, &ProgressMode::Silent).await;
    assert_eq!(again, DownloadOutcome::Skipped);
}
