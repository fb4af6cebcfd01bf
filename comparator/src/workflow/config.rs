use anyhow::Context;
use insarcore::dataset::aligned_path;
use insarcore::prelude::{
    AnalysisConfig, DEFAULT_INSAR_RADIUS_METERS, DEFAULT_MIN_TEMPORAL_COHERENCE,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Base directory; relative paths below are resolved against it.
    pub data_directory: PathBuf,
    pub stations_file: PathBuf,
    pub insar_file: PathBuf,
    pub parameters_file: PathBuf,
    pub plots_directory: PathBuf,
    pub log_file: Option<PathBuf>,
    /// TrueType font used for plot text; common system fonts are tried otherwise.
    pub font_file: Option<PathBuf>,
    pub min_temporal_coherence: f64,
    pub insar_radius_meters: u32,
    /// Render the regional and per-station velocity maps.
    pub render_maps: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::from("."),
            stations_file: PathBuf::from("stations_list"),
            insar_file: PathBuf::from("insar.csv"),
            parameters_file: PathBuf::from("parameters.csv"),
            plots_directory: PathBuf::from("plots"),
            log_file: Some(PathBuf::from("workflow.log")),
            font_file: None,
            min_temporal_coherence: DEFAULT_MIN_TEMPORAL_COHERENCE,
            insar_radius_meters: DEFAULT_INSAR_RADIUS_METERS,
            render_maps: true,
        }
    }
}

/// Command-line values that take precedence over the YAML file.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub data_directory: Option<PathBuf>,
    pub stations_file: Option<PathBuf>,
    pub insar_file: Option<PathBuf>,
    pub min_temporal_coherence: Option<f64>,
    pub insar_radius_meters: Option<u32>,
    pub skip_maps: bool,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(dir) = &overrides.data_directory {
            self.data_directory = dir.clone();
        }
        if let Some(file) = &overrides.stations_file {
            self.stations_file = file.clone();
        }
        if let Some(file) = &overrides.insar_file {
            self.insar_file = file.clone();
        }
        if let Some(coherence) = overrides.min_temporal_coherence {
            self.min_temporal_coherence = coherence;
        }
        if let Some(radius) = overrides.insar_radius_meters {
            self.insar_radius_meters = radius;
        }
        if overrides.skip_maps {
            self.render_maps = false;
        }
        self
    }

    pub fn to_analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            min_temporal_coherence: self.min_temporal_coherence,
            insar_radius_meters: self.insar_radius_meters,
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_directory.join(path)
        }
    }

    pub fn stations_path(&self) -> PathBuf {
        self.resolve(&self.stations_file)
    }

    pub fn insar_path(&self) -> PathBuf {
        self.resolve(&self.insar_file)
    }

    pub fn aligned_insar_path(&self) -> PathBuf {
        aligned_path(&self.insar_path())
    }

    pub fn parameters_path(&self) -> PathBuf {
        self.resolve(&self.parameters_file)
    }

    pub fn plots_path(&self) -> PathBuf {
        self.resolve(&self.plots_directory)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_file.as_deref().map(|p| self.resolve(p))
    }
}
