use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::ui::OutputMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fiberprep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stage, prepare and package fiber design job files")]
#[command(
    long_about = "FiberPrep moves a fiber design job through its filesystem workflow: staging \
                  downloaded shapefile archives into a dated working directory, finishing the \
                  reprojected intermediate shapefiles for the design tool, and packaging the \
                  tool's output layers into a deliverable zip."
)]
#[command(after_help = "EXAMPLES:\n  \
    fiberprep setup 550491 Washington \"Oak Harbor\"\n  \
    fiberprep prepare 550491\n  \
    fiberprep package 550491 Washington \"Oak Harbor\" ~/Desktop/Workspaces/550491/output --yes\n  \
    fiberprep generate-config\n\n\
    Run without a subcommand for the interactive menu.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file path
    #[arg(short, long, global = true, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Override the downloads root directory
    #[arg(long, global = true)]
    pub downloads: Option<PathBuf>,

    /// Override the documents root directory
    #[arg(long, global = true)]
    pub documents: Option<PathBuf>,

    /// Override the desktop root directory
    #[arg(long, global = true)]
    pub desktop: Option<PathBuf>,

    /// Override the design tool workspaces root directory
    #[arg(long, global = true)]
    pub workspaces: Option<PathBuf>,

    /// Deliverable layer names (comma-separated)
    #[arg(long, global = true, help = "Deliverable layer base names (comma-separated)")]
    pub layers: Option<String>,

    /// Sibling files expected per shapefile layer
    #[arg(long, global = true)]
    pub files_per_layer: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stage downloaded job archives into a dated working directory
    Setup {
        /// Job number to match in archive filenames
        #[arg(value_parser = validate_job_number)]
        job: String,
        /// State name for the directory layout
        state: String,
        /// City name for the directory layout
        city: String,
    },

    /// Prepare the reprojected intermediate shapefiles for the design tool
    Prepare {
        /// Job number whose staged directories should be prepared
        #[arg(value_parser = validate_job_number)]
        job: String,
    },

    /// Package the design tool's output layers into a deliverable zip
    Package {
        /// Job number spliced into the deliverable filenames
        #[arg(value_parser = validate_job_number)]
        job: String,
        /// State name for the deliverable layout
        state: String,
        /// City name for the deliverable layout
        city: String,
        /// The design tool's output directory
        source: PathBuf,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Write a sample configuration file and exit
    GenerateConfig {
        /// Where to write the file (defaults to fiberprep.toml)
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl OutputFormat {
    pub fn to_mode(self) -> OutputMode {
        match self {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_downloads(self.downloads.clone())
            .with_documents(self.documents.clone())
            .with_desktop(self.desktop.clone())
            .with_workspaces(self.workspaces.clone())
            .with_deliverable_layers(self.layers.clone())
            .with_files_per_layer(self.files_per_layer)
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

/// Job numbers end up spliced into filenames; separators would silently change
/// the directory layout.
pub fn validate_job_number(s: &str) -> std::result::Result<String, String> {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return Err("Job number must not be empty".to_string());
    }

    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err("Job number must not contain path separators".to_string());
    }

    Ok(trimmed.to_string())
}
