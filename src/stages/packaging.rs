use crate::archive::compress_directory;
use crate::config::Config;
use crate::error::{FiberPrepError, Result};
use crate::scanner::JobScanner;
use crate::stages::copy_file;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// What the packaging stage did, for the operation summary. `archive_path` is
/// set only when the copied count matched and the zip was produced.
#[derive(Debug, Clone, Serialize)]
pub struct PackagingReport {
    pub files_copied: usize,
    pub expected: usize,
    pub output_dir: PathBuf,
    pub archive_path: Option<PathBuf>,
}

/// Stage 3: collect the design tool's output layers into a deliverable zip.
///
/// Only files whose stem is on the deliverable allow-list are copied, renamed
/// with the job number spliced in after the constant prefix. Zipping is gated
/// on the copied count matching layers x siblings exactly; on a mismatch the
/// uncompressed directory is left in place for inspection.
pub struct DeliverablePackaging<'a> {
    config: &'a Config,
    date_stamp: &'a str,
}

impl<'a> DeliverablePackaging<'a> {
    pub fn new(config: &'a Config, date_stamp: &'a str) -> Self {
        Self { config, date_stamp }
    }

    /// `confirm` is invoked with the output directory before anything is
    /// created; `on_file_copied` after each copied file, for progress
    /// reporting.
    pub fn run(
        &self,
        scanner: &JobScanner,
        state: &str,
        city: &str,
        source: &Path,
        confirm: &dyn Fn(&Path) -> Result<bool>,
        on_file_copied: &dyn Fn(),
    ) -> Result<PackagingReport> {
        let job_number = scanner.filter().job_number();

        let output_dir = self
            .config
            .roots
            .desktop
            .join("Deliverables")
            .join(state)
            .join(city)
            .join(format!("{}-{}", self.date_stamp, job_number));

        if output_dir.exists() {
            return Err(FiberPrepError::DestinationExists {
                path: output_dir.display().to_string(),
            });
        }

        if !confirm(&output_dir)? {
            return Err(FiberPrepError::Cancelled);
        }

        let matched =
            scanner.collect_files_by_stem(source, &self.config.packaging.deliverable_layers, false)?;

        fs::create_dir_all(&output_dir)?;

        let mut files_copied = 0;

        for file in &matched {
            let renamed = insert_job_number(
                &file.file_name,
                job_number,
                self.config.packaging.prefix_len,
            );
            copy_file(&file.path, &output_dir.join(renamed))?;
            files_copied += 1;
            on_file_copied();
        }

        let expected = self.config.expected_deliverable_count();

        if files_copied != expected {
            return Err(FiberPrepError::CountMismatch {
                expected,
                found: files_copied,
            });
        }

        let archive_path = zip_path(&output_dir);
        compress_directory(&output_dir, &archive_path)?;
        fs::remove_dir_all(&output_dir)?;

        Ok(PackagingReport {
            files_copied,
            expected,
            output_dir,
            archive_path: Some(archive_path),
        })
    }
}

/// `OUT_Closures.shp` with job 550491 and prefix length 3 becomes
/// `OUT_550491_Closures.shp`.
fn insert_job_number(file_name: &str, job_number: &str, prefix_len: usize) -> String {
    let split = file_name
        .char_indices()
        .map(|(i, _)| i)
        .nth(prefix_len)
        .unwrap_or(file_name.len());

    format!(
        "{}_{}{}",
        &file_name[..split],
        job_number,
        &file_name[split..]
    )
}

/// The sibling zip target for a deliverable directory.
fn zip_path(output_dir: &Path) -> PathBuf {
    let mut name = output_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".zip");
    output_dir.with_file_name(name)
}
