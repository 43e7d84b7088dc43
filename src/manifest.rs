use crate::error::{FiberPrepError, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Registry directory under the documents root holding one manifest per job.
const MANIFEST_DIR: &str = ".fiberprep";

/// Record of the directories the setup stage created for a job, written so
/// later stages can use the exact paths instead of inferring them from
/// directory names. A job number maps to exactly one manifest; staging the
/// same job again overwrites it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobManifest {
    pub job_number: String,
    pub state: String,
    pub city: String,
    pub job_dir: PathBuf,
    pub source_dir: PathBuf,
    pub workspace_dir: PathBuf,
    pub created_at: DateTime<Local>,
}

impl JobManifest {
    pub fn path_for(documents_root: &Path, job_number: &str) -> PathBuf {
        documents_root
            .join(MANIFEST_DIR)
            .join(format!("{}.json", job_number))
    }

    pub fn save(&self, documents_root: &Path) -> Result<()> {
        let path = Self::path_for(documents_root, &self.job_number);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| FiberPrepError::Config {
                message: format!("Failed to serialize job manifest: {}", e),
            })?;
        fs::write(&path, content)?;

        Ok(())
    }

    /// Load the manifest for a job, if one was recorded. A manifest that can
    /// no longer be parsed is an error; delete the file to fall back to
    /// directory scanning.
    pub fn load(documents_root: &Path, job_number: &str) -> Result<Option<Self>> {
        let path = Self::path_for(documents_root, job_number);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let manifest = serde_json::from_str(&content).map_err(|e| FiberPrepError::Config {
            message: format!("Failed to parse job manifest {}: {}", path.display(), e),
        })?;

        Ok(Some(manifest))
    }

    /// Whether the recorded directories still exist. The operator may have
    /// moved or renamed them by hand since staging.
    pub fn is_current(&self) -> bool {
        self.source_dir.is_dir() && self.workspace_dir.is_dir()
    }
}
