use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::error::DownloadError;

/// Zips the files of `chapter_dir` into `archive_path` (a `.cbz`), in
/// file-name order. The archive is written next to its final name and
/// renamed once complete, so a `.cbz` on disk is never half-written.
///
/// With `clean` set, `chapter_dir` is removed after the archive is in place.
pub fn create_chapter_cbz(chapter_dir: &Path, archive_path: &Path, clean: bool) -> Result<PathBuf, DownloadError> {
    let mut entries = fs::read_dir(chapter_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect::<Vec<_>>();
    entries.sort();

    if entries.is_empty() {
        return Err(DownloadError::ArchiveError(format!(
            "no files to archive in {}",
            chapter_dir.display()
        )));
    }

    let partial_path = archive_path.with_extension("cbz.part");
    if let Err(e) = write_archive(&entries, &partial_path) {
        let _ = fs::remove_file(&partial_path);
        return Err(e);
    }
    fs::rename(&partial_path, archive_path)?;
    info!("created {}", archive_path.display());

    if clean {
        fs::remove_dir_all(chapter_dir)?;
        debug!("removed {}", chapter_dir.display());
    }

    Ok(archive_path.to_path_buf())
}

fn write_archive(entries: &[PathBuf], path: &Path) -> Result<(), DownloadError> {
    let file = File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        let name = entry
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| DownloadError::ArchiveError(format!("invalid file name {}", entry.display())))?;
        zip.start_file(name, options)?;
        let mut source = File::open(entry)?;
        io::copy(&mut source, &mut zip)?;
    }

    zip.finish()?;
    Ok(())
}
