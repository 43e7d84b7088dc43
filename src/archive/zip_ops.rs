use crate::error::{FiberPrepError, Result};
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Unpack a zip archive into `dest`, creating it if necessary. Returns the
/// number of entries in the archive.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = fs::File::open(archive_path)?;

    let mut archive = ZipArchive::new(file).map_err(|e| FiberPrepError::Archive {
        path: archive_path.display().to_string(),
        source: e,
    })?;

    let entries = archive.len();

    archive.extract(dest).map_err(|e| FiberPrepError::Archive {
        path: archive_path.display().to_string(),
        source: e,
    })?;

    Ok(entries)
}

/// Zip the contents of `dir` into `archive_path`. Entry names are relative to
/// `dir` with forward slashes, so the archive unpacks without the wrapping
/// directory. Returns the number of files written.
pub fn compress_directory(dir: &Path, archive_path: &Path) -> Result<usize> {
    if !dir.is_dir() {
        return Err(FiberPrepError::InvalidPath {
            path: dir.display().to_string(),
        });
    }

    let file = fs::File::create(archive_path)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut written = 0usize;

    for entry in WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|_| FiberPrepError::InvalidPath {
                path: entry.path().display().to_string(),
            })?;

        let entry_name = relative.to_string_lossy().replace('\\', "/");

        writer
            .start_file(entry_name, options)
            .map_err(|e| FiberPrepError::Archive {
                path: archive_path.display().to_string(),
                source: e,
            })?;

        let mut source = fs::File::open(entry.path())?;
        io::copy(&mut source, &mut writer)?;
        written += 1;
    }

    writer.finish().map_err(|e| FiberPrepError::Archive {
        path: archive_path.display().to_string(),
        source: e,
    })?;

    Ok(written)
}
