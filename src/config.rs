use crate::error::{FiberPrepError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The six workspace output layers recognized for delivery. Which layers the
/// customer wants can change per engagement, so the list lives in the config
/// file rather than in code.
const DEFAULT_DELIVERABLE_LAYERS: &[&str] = &[
    "OUT_AccessStructures",
    "OUT_Closures",
    "OUT_DistributionCables",
    "OUT_DropCables",
    "OUT_DropClusters",
    "OUT_FeederCables",
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub roots: RootsConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub packaging: PackagingConfig,
}

/// The four fixed filesystem locations the workflow moves files between.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RootsConfig {
    /// Scanned for downloaded job archives.
    pub downloads: PathBuf,
    /// Staging location, organized {state}/{city}/{date}-{job}.
    pub documents: PathBuf,
    /// Holds the Deliverables packaging tree.
    pub desktop: PathBuf,
    /// Root of the external design tool's workspace directories.
    pub workspaces: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Appended to an archive's stem once it has been staged. Marked archives
    /// are excluded from future job-number matches.
    pub processed_marker: String,
    pub reprojected_dir: String,
    pub ready_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PackagingConfig {
    pub deliverable_layers: Vec<String>,
    /// Sibling files per shapefile layer (.shp, .shx, .dbf, .prj, .cpg).
    pub files_per_layer: usize,
    /// Length of the constant filename prefix the job number is inserted after.
    pub prefix_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: RootsConfig::default(),
            naming: NamingConfig::default(),
            packaging: PackagingConfig::default(),
        }
    }
}

impl Default for RootsConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            downloads: home.join("Downloads"),
            documents: home.join("Documents"),
            desktop: home.join("Desktop"),
            workspaces: home.join("Desktop").join("Workspaces"),
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            processed_marker: "_processed".to_string(),
            reprojected_dir: "reprojected".to_string(),
            ready_dir: "ready".to_string(),
        }
    }
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            deliverable_layers: DEFAULT_DELIVERABLE_LAYERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            files_per_layer: 5,
            prefix_len: 3,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(FiberPrepError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| FiberPrepError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| FiberPrepError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["fiberprep.toml", ".fiberprep.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, overrides: &CliOverrides) {
        if let Some(ref downloads) = overrides.downloads {
            self.roots.downloads = downloads.clone();
        }

        if let Some(ref documents) = overrides.documents {
            self.roots.documents = documents.clone();
        }

        if let Some(ref desktop) = overrides.desktop {
            self.roots.desktop = desktop.clone();
        }

        if let Some(ref workspaces) = overrides.workspaces {
            self.roots.workspaces = workspaces.clone();
        }

        if let Some(ref layers) = overrides.deliverable_layers {
            self.packaging.deliverable_layers = layers
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(files_per_layer) = overrides.files_per_layer {
            self.packaging.files_per_layer = files_per_layer;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| FiberPrepError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| FiberPrepError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    /// Startup validation. A missing root is fatal; nothing is created
    /// implicitly because the roots are operator-owned locations.
    pub fn validate(&self) -> Result<()> {
        for (name, path) in self.root_entries() {
            if !path.exists() {
                return Err(FiberPrepError::RootMissing {
                    name: name.to_string(),
                    path: path.display().to_string(),
                });
            }
        }

        if self.packaging.deliverable_layers.is_empty() {
            return Err(FiberPrepError::Config {
                message: "At least one deliverable layer must be configured".to_string(),
            });
        }

        if self.packaging.files_per_layer == 0 {
            return Err(FiberPrepError::Config {
                message: "files_per_layer must be greater than 0".to_string(),
            });
        }

        if self.packaging.prefix_len == 0 {
            return Err(FiberPrepError::Config {
                message: "prefix_len must be greater than 0".to_string(),
            });
        }

        for layer in &self.packaging.deliverable_layers {
            if layer.len() < self.packaging.prefix_len {
                return Err(FiberPrepError::Config {
                    message: format!(
                        "Deliverable layer '{}' is shorter than prefix_len ({})",
                        layer, self.packaging.prefix_len
                    ),
                });
            }
        }

        Ok(())
    }

    fn root_entries(&self) -> [(&'static str, &Path); 4] {
        [
            ("downloads", self.roots.downloads.as_path()),
            ("documents", self.roots.documents.as_path()),
            ("desktop", self.roots.desktop.as_path()),
            ("workspaces", self.roots.workspaces.as_path()),
        ]
    }

    /// Total file count the packaging stage must copy before it will zip.
    pub fn expected_deliverable_count(&self) -> usize {
        self.packaging.deliverable_layers.len() * self.packaging.files_per_layer
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub downloads: Option<PathBuf>,
    pub documents: Option<PathBuf>,
    pub desktop: Option<PathBuf>,
    pub workspaces: Option<PathBuf>,
    pub deliverable_layers: Option<String>,
    pub files_per_layer: Option<usize>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_downloads(mut self, downloads: Option<PathBuf>) -> Self {
        self.downloads = downloads;
        self
    }

    pub fn with_documents(mut self, documents: Option<PathBuf>) -> Self {
        self.documents = documents;
        self
    }

    pub fn with_desktop(mut self, desktop: Option<PathBuf>) -> Self {
        self.desktop = desktop;
        self
    }

    pub fn with_workspaces(mut self, workspaces: Option<PathBuf>) -> Self {
        self.workspaces = workspaces;
        self
    }

    pub fn with_deliverable_layers(mut self, layers: Option<String>) -> Self {
        self.deliverable_layers = layers;
        self
    }

    pub fn with_files_per_layer(mut self, files_per_layer: Option<usize>) -> Self {
        self.files_per_layer = files_per_layer;
        self
    }
}
