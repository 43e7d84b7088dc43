use crate::archive::extract_archive;
use crate::config::Config;
use crate::error::{FiberPrepError, Result};
use crate::manifest::JobManifest;
use crate::scanner::JobScanner;
use crate::stages::copy_file;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What the setup stage did, for the operation summary.
#[derive(Debug, Clone, Serialize)]
pub struct SetupReport {
    pub archives_processed: usize,
    pub files_staged: usize,
    pub job_dir: PathBuf,
    pub workspace_dir: PathBuf,
}

/// Stage 1: stage downloaded job archives into a dated documents directory.
///
/// Every unprocessed archive matching the job number is unpacked and its files
/// are copied flattened into `{documents}/{state}/{city}/{date}-{job}`. Staged
/// archives are renamed with the processed marker so a rerun picks up only
/// newly downloaded ones. The stage also creates the empty reprojection
/// subdirectory and the mirrored workspace directory the later stages expect.
pub struct WorkspaceSetup<'a> {
    config: &'a Config,
    date_stamp: &'a str,
}

impl<'a> WorkspaceSetup<'a> {
    pub fn new(config: &'a Config, date_stamp: &'a str) -> Self {
        Self { config, date_stamp }
    }

    pub fn run(&self, scanner: &JobScanner, state: &str, city: &str) -> Result<SetupReport> {
        let job_number = scanner.filter().job_number();

        let archives = scanner.find_job_archives(&self.config.roots.downloads)?;
        if archives.is_empty() {
            return Err(FiberPrepError::NoArchivesFound {
                job_number: job_number.to_string(),
            });
        }

        let dated_name = format!("{}-{}", self.date_stamp, job_number);

        let job_dir = self
            .config
            .roots
            .documents
            .join(state)
            .join(city)
            .join(&dated_name);

        // Checked before any extraction so a conflict leaves the downloads
        // untouched and re-runnable.
        if job_dir.exists() {
            return Err(FiberPrepError::DestinationExists {
                path: job_dir.display().to_string(),
            });
        }

        fs::create_dir_all(&job_dir)?;

        let mut files_staged = 0;

        for archive in &archives {
            let unpack_root = archive
                .path
                .parent()
                .unwrap_or(self.config.roots.downloads.as_path());

            let unpack_dir = tempfile::Builder::new()
                .prefix("fiberprep-unpack-")
                .tempdir_in(unpack_root)?;

            extract_archive(&archive.path, unpack_dir.path())?;
            files_staged += flatten_into(unpack_dir.path(), &job_dir)?;

            let marked = scanner.filter().processed_name(&archive.file_name);
            fs::rename(&archive.path, unpack_root.join(marked))?;
        }

        fs::create_dir_all(job_dir.join(&self.config.naming.reprojected_dir))?;

        let workspace_dir = self
            .config
            .roots
            .workspaces
            .join(state)
            .join(city)
            .join(&dated_name);
        fs::create_dir_all(&workspace_dir)?;

        // Record the created paths so the prep stage can use them directly
        // instead of re-inferring them from directory names.
        let manifest = JobManifest {
            job_number: job_number.to_string(),
            state: state.to_string(),
            city: city.to_string(),
            job_dir: job_dir.clone(),
            source_dir: job_dir.join(&self.config.naming.reprojected_dir),
            workspace_dir: workspace_dir.clone(),
            created_at: chrono::Local::now(),
        };
        manifest.save(&self.config.roots.documents)?;

        Ok(SetupReport {
            archives_processed: archives.len(),
            files_staged,
            job_dir,
            workspace_dir,
        })
    }
}

/// Copy every file under `source` directly into `dest`, discarding the
/// directory structure the archive shipped with. Later files win on a name
/// collision, matching the walk order.
fn flatten_into(source: &Path, dest: &Path) -> Result<usize> {
    let mut copied = 0;

    for entry in WalkDir::new(source)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        copy_file(entry.path(), &dest.join(entry.file_name()))?;
        copied += 1;
    }

    Ok(copied)
}
