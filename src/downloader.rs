use std::env;
use std::path::{Path, PathBuf};

use reqwest::Url;

use crate::error::DownloadError;

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const DEFAULT_EXTENSION: &str = "jpg";
/// Longest suffix appended to a sanitized name (the in-progress archive).
const ARCHIVE_PART_SUFFIX: &str = ".cbz.part";
/// Names stay short enough that `<name>.cbz.part` fits in 255 bytes.
pub const MAX_NAME_BYTES: usize = 255 - ARCHIVE_PART_SUFFIX.len();

/// Builds a path for a chapter directory with OS-aware path handling
pub fn build_chapter_path(output_dir: &Path, chapter_title: &str) -> PathBuf {
    output_dir.join(sanitize_filename(chapter_title))
}

/// Path of the `.cbz` archive that sits next to the chapter directory
pub fn build_archive_path(output_dir: &Path, chapter_title: &str) -> PathBuf {
    output_dir.join(format!("{}.cbz", sanitize_filename(chapter_title)))
}

/// Ensures a directory exists, creating it if necessary
pub fn ensure_dir_exists(path: &Path) -> Result<(), DownloadError> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Sanitizes a string to be safe as a filename across different operating systems
pub fn sanitize_filename(input: &str) -> String {
    let mut result = input
        .chars()
        .map(|c| if INVALID_CHARS.contains(&c) || c.is_control() { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string();

    if result.is_empty() {
        result.push('_');
    }

    // Handle Windows reserved filenames
    if env::consts::OS == "windows" {
        let reserved_names = [
            "CON", "PRN", "AUX", "NUL",
            "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
            "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
        ];

        if reserved_names.iter().any(|&name| result.eq_ignore_ascii_case(name)) {
            result = format!("_{}", result);
        }
    }

    // A leading dot would hide the folder on Unix
    if result.starts_with('.') {
        result = format!("_{}", result);
    }

    if result.len() > MAX_NAME_BYTES {
        let mut cut = MAX_NAME_BYTES;
        while !result.is_char_boundary(cut) {
            cut -= 1;
        }
        result.truncate(cut);
    }

    result
}

/// Lower-cased extension of the URL path, without the dot.
///
/// Query strings and fragments are ignored. Returns `None` when the last
/// path segment has no extension.
pub fn file_extension(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    // Only the text after the last '/' counts, so `/a.png/` has no extension
    let name = path.rsplit('/').next().unwrap_or_default().trim_start_matches('.');
    let dot = name.rfind('.')?;
    let extension = &name[dot + 1..];
    if extension.is_empty() {
        return None;
    }
    Some(extension.to_lowercase())
}

/// `0000.png`, `0001.jpg`, ... derived from the position in the chapter.
pub fn image_file_name(index: usize, url: &str) -> String {
    let extension = file_extension(url).unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("{:04}.{}", index, extension)
}

/// Resolves a possibly relative `href` against the page it was found on.
pub fn resolve_url(base: &str, href: &str) -> String {
    if Url::parse(href).is_ok() {
        return href.to_string();
    }
    match Url::parse(base).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_from_url_path() {
        assert_eq!(file_extension("https://cdn.example.com/ch1/01.PNG").as_deref(), Some("png"));
        assert_eq!(file_extension("https://cdn.example.com/ch1/01.webp?token=a.b").as_deref(), Some("webp"));
        assert_eq!(file_extension("https://cdn.example.com/ch1/01"), None);
        assert_eq!(file_extension("https://cdn.example.com/ch1/.hidden"), None);
        assert_eq!(file_extension("https://cdn.example.com/ch1/01.png/"), None);
        assert_eq!(file_extension("https://cdn.example.com/ch1.d/01"), None);
        assert_eq!(file_extension("https://cdn.example.com/ch1/01."), None);
        assert_eq!(file_extension("https://cdn.example.com/ch1/.cover.gif").as_deref(), Some("gif"));
    }

    #[test]
    fn image_names_are_zero_padded() {
        assert_eq!(image_file_name(0, "https://x.org/a.png"), "0000.png");
        assert_eq!(image_file_name(12, "https://x.org/noext"), "0012.jpg");
        assert_eq!(image_file_name(1234, "https://x.org/a.gif"), "1234.gif");
        assert_eq!(image_file_name(3, "https://x.org/a.png/"), "0003.jpg");
    }

    #[test]
    fn relative_urls_are_resolved() {
        assert_eq!(
            resolve_url("https://mangaonline.biz/capitulo/1/", "/img/01.jpg"),
            "https://mangaonline.biz/img/01.jpg"
        );
        assert_eq!(
            resolve_url("https://mangaonline.biz/capitulo/1/", "https://cdn.org/01.jpg"),
            "https://cdn.org/01.jpg"
        );
    }

    #[test]
    fn long_names_leave_room_for_archive_suffix() {
        let sanitized = sanitize_filename(&format!("Chapter 1 {}", "x".repeat(300)));
        assert_eq!(sanitized.len(), MAX_NAME_BYTES);
        assert!(format!("{}.cbz.part", sanitized).len() <= 255);
    }

    #[test]
    fn sanitize_keeps_spaces_and_case() {
        assert_eq!(sanitize_filename("  Chapter 1  "), "Chapter 1");
        assert_eq!(sanitize_filename("Ch. 5: What?"), "Ch. 5_ What_");
        assert_eq!(sanitize_filename(".secret"), "_.secret");
        assert_eq!(sanitize_filename("   "), "_");
    }
}
