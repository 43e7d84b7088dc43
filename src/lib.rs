pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod manifest;
pub mod scanner;
pub mod shapefile;
pub mod stages;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, Command, OutputFormat};
pub use config::{CliOverrides, Config, NamingConfig, PackagingConfig, RootsConfig};
pub use error::{FiberPrepError, Result, UserFriendlyError};

// Core functionality re-exports
pub use manifest::JobManifest;
pub use scanner::{JobArchive, JobScanner, MatchedFile, NameFilter};
pub use shapefile::AttributeTable;
pub use stages::{
    DeliverablePackaging, PackagingReport, PrepReport, SetupReport, ShapefilePrep, WorkspaceSetup,
};
pub use ui::{GracefulShutdown, MenuChoice, OutputFormatter, OutputMode, ProgressManager};

use std::path::Path;
use std::time::Instant;

/// Main library interface for the job file workflow.
///
/// Holds the validated configuration plus the shared UI plumbing, and exposes
/// one method per workflow stage. Stages are independent; each invocation
/// runs exactly one of them against the current filesystem state.
pub struct FiberPrep {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
    date_stamp: String,
}

impl FiberPrep {
    /// Create a new FiberPrep instance with the provided configuration
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
            date_stamp: today_stamp(),
        })
    }

    /// Create a new FiberPrep instance for testing (no signal handler conflicts)
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(false);
        let shutdown = GracefulShutdown::new_for_test();

        Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
            date_stamp: today_stamp(),
        }
    }

    /// Create FiberPrep instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = cli_args.output_format.to_mode();

        Self::new(config, output_mode, cli_args.verbosity_level(), cli_args.quiet)
    }

    /// Override the date stamp used in directory names (normally today,
    /// `YYYYMMDD`).
    pub fn with_date_stamp<S: Into<String>>(mut self, date_stamp: S) -> Self {
        self.date_stamp = date_stamp.into();
        self
    }

    /// Stage 1: stage downloaded archives for a job into the documents tree.
    pub fn set_up_workspace(&self, job_number: &str, state: &str, city: &str) -> Result<SetupReport> {
        let start_time = Instant::now();

        self.shutdown.check_shutdown()?;
        self.output_formatter
            .start_operation("Setting up working environment");
        self.output_formatter.info(&format!(
            "Scanning {} for job {} archives",
            self.config.roots.downloads.display(),
            job_number
        ));
        self.output_formatter
            .debug(&format!("Using date stamp {}", self.date_stamp));

        let scanner = self.scanner_for(job_number);
        let spinner = self.progress_manager.create_spinner("Staging job archives");

        let result = WorkspaceSetup::new(&self.config, &self.date_stamp).run(&scanner, state, city);

        match &result {
            Ok(report) => ui::finish_progress_with_summary(
                &spinner,
                &format!(
                    "Staged {} files from {} archives",
                    report.files_staged, report.archives_processed
                ),
                start_time.elapsed(),
            ),
            Err(_) => spinner.abandon_with_message("Setup failed".to_string()),
        }

        let report = result?;
        self.shutdown.check_shutdown()?;

        self.output_formatter.print_setup_summary(&report);

        Ok(report)
    }

    /// Stage 2: finish the reprojected shapefiles and feed the design tool.
    pub fn prepare_shapefiles(&self, job_number: &str) -> Result<PrepReport> {
        let start_time = Instant::now();

        self.shutdown.check_shutdown()?;
        self.output_formatter
            .start_operation("Preparing intermediate shapefiles");
        self.output_formatter.info(&format!(
            "Locating staged directories for job {}",
            job_number
        ));

        let scanner = self.scanner_for(job_number);
        let spinner = self
            .progress_manager
            .create_spinner("Editing attribute tables");

        let result = ShapefilePrep::new(&self.config).run(&scanner);

        match &result {
            Ok(report) => ui::finish_progress_with_summary(
                &spinner,
                &format!(
                    "Updated {} records, copied {} files",
                    report.addresses_updated + report.access_points_updated,
                    report.files_copied
                ),
                start_time.elapsed(),
            ),
            Err(_) => spinner.abandon_with_message("Preparation failed".to_string()),
        }

        let report = result?;
        self.shutdown.check_shutdown()?;

        self.output_formatter.print_prep_summary(&report);

        Ok(report)
    }

    /// Stage 3: package the design tool's output into a deliverable zip.
    ///
    /// The confirmation callback is invoked with the output directory before
    /// anything is created; returning `Ok(false)` cancels the run.
    pub fn package_deliverable(
        &self,
        job_number: &str,
        state: &str,
        city: &str,
        source: &Path,
        confirm: &dyn Fn(&Path) -> Result<bool>,
    ) -> Result<PackagingReport> {
        let start_time = Instant::now();

        self.shutdown.check_shutdown()?;
        self.output_formatter
            .start_operation("Creating deliverable package");
        self.output_formatter.info(&format!(
            "Collecting deliverable layers from {}",
            source.display()
        ));

        let scanner = self.scanner_for(job_number);
        let expected = self.config.expected_deliverable_count();
        self.output_formatter
            .debug(&format!("Expecting {} deliverable files", expected));

        let progress = self.progress_manager.create_file_progress(expected as u64);

        // Prompts must not fight the progress bar for the terminal.
        let suspended_confirm =
            |path: &Path| -> Result<bool> { self.progress_manager.suspend(|| confirm(path)) };

        let result = DeliverablePackaging::new(&self.config, &self.date_stamp).run(
            &scanner,
            state,
            city,
            source,
            &suspended_confirm,
            &|| progress.inc(1),
        );

        match &result {
            Ok(report) => ui::finish_progress_with_summary(
                &progress,
                &format!("Packaged {} files", report.files_copied),
                start_time.elapsed(),
            ),
            Err(_) => progress.abandon_with_message("Packaging failed".to_string()),
        }

        let report = result?;
        self.shutdown.check_shutdown()?;

        self.output_formatter.print_packaging_summary(&report);

        Ok(report)
    }

    fn scanner_for(&self, job_number: &str) -> JobScanner {
        JobScanner::new(NameFilter::new(
            job_number,
            self.config.naming.processed_marker.as_str(),
        ))
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config).map_err(FiberPrepError::Io)?;
        Ok(())
    }

    /// Get configuration reference
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get output formatter reference
    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Get progress manager reference
    pub fn progress_manager(&self) -> &ProgressManager {
        &self.progress_manager
    }

    /// Check if shutdown has been requested
    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Request graceful shutdown
    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &FiberPrepError) {
        self.progress_manager.clear();
        self.output_formatter.print_user_friendly_error(error);
    }
}

fn today_stamp() -> String {
    chrono::Local::now().format("%Y%m%d").to_string()
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
