use crate::error::{FiberPrepError, Result};
use crate::scanner::name_filter::{file_stem, NameFilter};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Path exclusion tokens disambiguating the workspace directory itself from
/// the external tool's own subdirectories.
const WORKSPACE_EXCLUSIONS: &[&str] = &["input", "saved states", "output"];

/// A downloaded archive matched to the current job.
#[derive(Debug, Clone)]
pub struct JobArchive {
    pub path: PathBuf,
    pub file_name: String,
}

/// A file matched by stem during a tree walk.
#[derive(Debug, Clone)]
pub struct MatchedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub stem: String,
    pub extension: Option<String>,
}

impl MatchedFile {
    fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let stem = file_stem(&file_name).to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_string());

        Some(Self {
            path: path.to_path_buf(),
            file_name,
            stem,
            extension,
        })
    }
}

/// Recursive filesystem discovery for one job number.
///
/// Walks the roots and substring-matches path segments. Used for archive
/// discovery and as the fallback when no job manifest records the staged
/// directory paths.
pub struct JobScanner {
    filter: NameFilter,
}

impl JobScanner {
    pub fn new(filter: NameFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &NameFilter {
        &self.filter
    }

    /// All unprocessed archives under the downloads root whose filename
    /// contains the job number, sorted by path for deterministic staging.
    pub fn find_job_archives(&self, downloads_root: &Path) -> Result<Vec<JobArchive>> {
        ensure_directory(downloads_root)?;

        let mut archives = Vec::new();

        for entry in WalkDir::new(downloads_root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(file_name) = entry.file_name().to_str() else {
                continue;
            };

            if self.filter.is_job_archive(file_name) {
                archives.push(JobArchive {
                    path: entry.path().to_path_buf(),
                    file_name: file_name.to_string(),
                });
            }
        }

        archives.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(archives)
    }

    /// First directory under the documents root whose path contains the job
    /// number and the reprojected token but not the ready token.
    pub fn find_reprojected_dir(
        &self,
        documents_root: &Path,
        reprojected_token: &str,
        ready_token: &str,
    ) -> Result<PathBuf> {
        ensure_directory(documents_root)?;

        self.find_first_dir(documents_root, &[reprojected_token], &[ready_token])
            .ok_or_else(|| FiberPrepError::DiscoveryFailed {
                target: "reprojected shapefile directory".to_string(),
                job_number: self.filter.job_number().to_string(),
            })
    }

    /// First directory under the workspaces root whose path contains the job
    /// number and none of the external tool's own subdirectory names.
    pub fn find_workspace_dir(&self, workspaces_root: &Path) -> Result<PathBuf> {
        ensure_directory(workspaces_root)?;

        self.find_first_dir(workspaces_root, &[], WORKSPACE_EXCLUSIONS)
            .ok_or_else(|| FiberPrepError::DiscoveryFailed {
                target: "design tool workspace directory".to_string(),
                job_number: self.filter.job_number().to_string(),
            })
    }

    fn find_first_dir(&self, root: &Path, required: &[&str], excluded: &[&str]) -> Option<PathBuf> {
        WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .find(|e| self.filter.dir_matches(e.path(), required, excluded))
            .map(|e| e.path().to_path_buf())
    }

    /// Every file anywhere under `root` whose stem matches one of `stems`,
    /// sorted by path. Used by the prep stage (case-insensitive intermediate
    /// names) and the packaging stage (exact allow-list match).
    pub fn collect_files_by_stem(
        &self,
        root: &Path,
        stems: &[String],
        ignore_case: bool,
    ) -> Result<Vec<MatchedFile>> {
        ensure_directory(root)?;

        let lowered: Vec<String> = stems.iter().map(|s| s.to_lowercase()).collect();
        let mut matched = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(file) = MatchedFile::from_path(entry.path()) else {
                continue;
            };

            let is_match = if ignore_case {
                lowered.iter().any(|s| *s == file.stem.to_lowercase())
            } else {
                stems.iter().any(|s| *s == file.stem)
            };

            if is_match {
                matched.push(file);
            }
        }

        matched.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(matched)
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(FiberPrepError::InvalidPath {
            path: path.display().to_string(),
        });
    }

    if !path.is_dir() {
        return Err(FiberPrepError::InvalidPath {
            path: format!("{} is not a directory", path.display()),
        });
    }

    Ok(())
}
