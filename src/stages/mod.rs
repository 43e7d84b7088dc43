pub mod packaging;
pub mod shapefile_prep;
pub mod workspace_setup;

pub use packaging::{DeliverablePackaging, PackagingReport};
pub use shapefile_prep::{PrepReport, ShapefilePrep};
pub use workspace_setup::{SetupReport, WorkspaceSetup};

use crate::error::{FiberPrepError, Result};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Buffered file copy preserving the source modification time. Deliverable
/// reviewers sort by mtime, so copies must not look freshly created.
pub(crate) fn copy_file(source: &Path, dest: &Path) -> Result<u64> {
    if !source.is_file() {
        return Err(FiberPrepError::InvalidPath {
            path: source.display().to_string(),
        });
    }

    let mut reader = fs::File::open(source)?;
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, fs::File::create(dest)?);

    let total_bytes = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;

    if let Ok(metadata) = fs::metadata(source) {
        if let Ok(modified) = metadata.modified() {
            let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(modified));
        }
    }

    Ok(total_bytes)
}
