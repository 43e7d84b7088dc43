use thiserror::Error;

#[derive(Error, Debug)]
pub enum FiberPrepError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Required root directory '{name}' not found: {path}")]
    RootMissing { name: String, path: String },

    #[error("No unprocessed archives matching job {job_number} were found")]
    NoArchivesFound { job_number: String },

    #[error("Destination already exists: {path}")]
    DestinationExists { path: String },

    #[error("Could not locate {target} for job {job_number}")]
    DiscoveryFailed { target: String, job_number: String },

    #[error("Copied {found} deliverable files, expected {expected}")]
    CountMismatch { expected: usize, found: usize },

    #[error("Archive operation failed on {path}: {source}")]
    Archive {
        path: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Attribute table operation failed on {path}: {source}")]
    Table {
        path: String,
        #[source]
        source: dbase::Error,
    },

    #[error("Prompt failed: {message}")]
    Prompt { message: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Operation was cancelled by user")]
    Cancelled,
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for FiberPrepError {
    fn user_message(&self) -> String {
        match self {
            FiberPrepError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            FiberPrepError::RootMissing { name, path } => {
                format!("The {} directory was not found at {}", name, path)
            }
            FiberPrepError::NoArchivesFound { job_number } => {
                format!(
                    "No downloaded archives matching job {} are waiting to be processed",
                    job_number
                )
            }
            FiberPrepError::DestinationExists { path } => {
                format!("Destination directory already exists: {}", path)
            }
            FiberPrepError::DiscoveryFailed { target, job_number } => {
                format!("Could not locate the {} for job {}", target, job_number)
            }
            FiberPrepError::CountMismatch { expected, found } => {
                format!(
                    "Copied {} deliverable files but expected exactly {}",
                    found, expected
                )
            }
            FiberPrepError::Archive { path, source } => {
                format!("Archive operation failed on {}: {}", path, source)
            }
            FiberPrepError::Table { path, source } => {
                format!("Attribute table operation failed on {}: {}", path, source)
            }
            FiberPrepError::Cancelled => "Operation was cancelled by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            FiberPrepError::Config { .. } => Some(
                "Check your configuration file syntax, or regenerate one with 'fiberprep generate-config'."
                    .to_string(),
            ),
            FiberPrepError::RootMissing { .. } => Some(
                "Create the directory, or point fiberprep at the right place with --downloads, \
                 --documents, --desktop, --workspaces or a config file."
                    .to_string(),
            ),
            FiberPrepError::NoArchivesFound { .. } => Some(
                "Verify the job number and that the archive has been downloaded. Archives already \
                 marked as processed are skipped."
                    .to_string(),
            ),
            FiberPrepError::DestinationExists { .. } => Some(
                "Remove the existing directory and rerun if it is stale. Nothing was overwritten."
                    .to_string(),
            ),
            FiberPrepError::DiscoveryFailed { .. } => Some(
                "Run the setup stage first, and check that the staged directories still carry the \
                 job number in their path."
                    .to_string(),
            ),
            FiberPrepError::CountMismatch { .. } => Some(
                "The uncompressed deliverable directory was left in place for inspection. Check \
                 the workspace output path for missing or extra shapefile parts."
                    .to_string(),
            ),
            FiberPrepError::Table { .. } => Some(
                "Make sure the shapefile set is complete and not open in another application."
                    .to_string(),
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for FiberPrepError {
    fn from(error: toml::de::Error) -> Self {
        FiberPrepError::Config {
            message: error.to_string(),
        }
    }
}

impl From<dialoguer::Error> for FiberPrepError {
    fn from(error: dialoguer::Error) -> Self {
        match error {
            dialoguer::Error::IO(err) if err.kind() == std::io::ErrorKind::Interrupted => {
                FiberPrepError::Cancelled
            }
            other => FiberPrepError::Prompt {
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, FiberPrepError>;
